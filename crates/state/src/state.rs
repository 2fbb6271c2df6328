// Path: crates/state/src/state.rs
//! The durable root of the layered state.
//!
//! `State` keeps both staker registries and the supplies in memory and reads
//! every other record through from the store. Writes are buffered until
//! [`State::commit`], which flushes them, together with the per-height
//! validator weight and public-key diffs, as one atomic batch.

use crate::advance::fund_reward;
use crate::reward::RewardCurve;
use crate::stakers::{BaseStakers, DiffStatus, NodeMap, ValidatorDiff};
use pchain_api::reward::RewardCalculator;
use pchain_api::state::{Chain, StakerIterator};
use pchain_api::storage::{be64, KvStore, WriteBatch};
use pchain_types::codec::{from_bytes_canonical, to_bytes_canonical};
use pchain_types::config::{Genesis, StakingConfig};
use pchain_types::error::StateError;
use pchain_types::keys::{
    chain_key, decode_u64, id_key, parse_id_suffix, reward_pool_key, reward_utxo_key, supply_key,
    utxo_key, validator_diff_key, CHAIN_PREFIX, CURRENT_STAKER_PREFIX, CURRENT_SUPPLY_PREFIX,
    FEE_POOL_KEY, HEIGHT_KEY, PENDING_STAKER_PREFIX, PUBLIC_KEY_DIFF_PREFIX, REWARD_POOL_PREFIX,
    REWARD_UTXO_PREFIX, SUPERNET_PREFIX, TIMESTAMP_KEY, TRANSFORMATION_PREFIX, TX_PREFIX,
    WEIGHT_DIFF_PREFIX,
};
use pchain_types::ledger::{
    ChainRecord, StoredTx, SupernetRecord, SupernetTransformation, TxBody, TxStatus, Utxo, UtxoId,
    ValidatorWeightDiff,
};
use pchain_types::{Id, NodeId, Staker, PRIMARY_NETWORK_ID};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Record writes buffered since the last commit.
#[derive(Debug, Default)]
struct Unflushed {
    metadata: bool,
    supplies: BTreeSet<Id>,
    reward_pools: BTreeSet<Id>,
    utxos: BTreeMap<UtxoId, Option<Utxo>>,
    reward_utxos: BTreeMap<Id, Vec<Utxo>>,
    supernets: BTreeMap<Id, SupernetRecord>,
    transformations: BTreeMap<Id, SupernetTransformation>,
    chains: BTreeMap<Id, BTreeMap<Id, ChainRecord>>,
    txs: BTreeMap<Id, (StoredTx, TxStatus)>,
}

impl Unflushed {
    fn is_empty(&self) -> bool {
        !self.metadata
            && self.supplies.is_empty()
            && self.reward_pools.is_empty()
            && self.utxos.is_empty()
            && self.reward_utxos.is_empty()
            && self.supernets.is_empty()
            && self.transformations.is_empty()
            && self.chains.is_empty()
            && self.txs.is_empty()
    }
}

/// The last committed ledger state, plus the writes not yet committed.
pub struct State {
    store: Arc<dyn KvStore>,
    height: u64,
    timestamp: u64,
    fee_pool: u64,
    current_supply: BTreeMap<Id, u64>,
    reward_pool_supply: BTreeMap<Id, u64>,
    current_stakers: BaseStakers,
    pending_stakers: BaseStakers,
    unflushed: Unflushed,
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State")
            .field("height", &self.height)
            .field("timestamp", &self.timestamp)
            .field("current_stakers", &self.current_stakers.len())
            .field("pending_stakers", &self.pending_stakers.len())
            .finish_non_exhaustive()
    }
}

impl State {
    fn empty(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            height: 0,
            timestamp: 0,
            fee_pool: 0,
            current_supply: BTreeMap::new(),
            reward_pool_supply: BTreeMap::new(),
            current_stakers: BaseStakers::default(),
            pending_stakers: BaseStakers::default(),
            unflushed: Unflushed::default(),
        }
    }

    /// Writes `genesis` into an empty store and returns the state at height 0.
    ///
    /// Genesis validators go straight into the current set. Their potential
    /// reward follows the primary network curve of `config` and is funded
    /// from the genesis reward pool, minting any shortfall.
    pub fn from_genesis(
        store: Arc<dyn KvStore>,
        genesis: &Genesis,
        config: &StakingConfig,
    ) -> Result<Self, StateError> {
        config.validate()?;
        genesis.validate()?;
        if store.get(HEIGHT_KEY)?.is_some() {
            return Err(StateError::InvariantViolation(
                "store already holds a ledger".into(),
            ));
        }

        let mut state = Self::empty(store);
        state.set_timestamp(genesis.timestamp);
        state.set_fee_pool(0);
        let mut supply = genesis.initial_supply;
        let mut pool = genesis.initial_reward_pool;

        let curve = RewardCurve::new(config.reward.clone());
        for tx in &genesis.validators {
            let calculated = curve.calculate(tx.duration(), tx.start_time, tx.weight, pool)?;
            let funding = fund_reward(&PRIMARY_NETWORK_ID, calculated, pool, supply)?;
            pool = funding.reward_pool;
            supply = funding.current_supply;
            state.put_current_validator(Staker::new_current(tx, funding.reward)?);
            state.add_tx(
                StoredTx {
                    id: tx.tx_id,
                    body: TxBody::AddStaker(tx.clone()),
                },
                TxStatus::Committed,
            );
        }
        state.set_current_supply(&PRIMARY_NETWORK_ID, supply);
        state.set_reward_pool_supply(&PRIMARY_NETWORK_ID, pool);
        for utxo in &genesis.utxos {
            state.add_utxo(utxo.clone());
        }
        for chain in &genesis.chains {
            state.add_chain(chain.clone());
        }

        state.flush(0)?;
        tracing::info!(
            target: "state",
            timestamp = genesis.timestamp,
            validators = genesis.validators.len(),
            supply,
            "initialised ledger from genesis"
        );
        Ok(state)
    }

    /// Rebuilds the last committed state from `store`.
    pub fn load(store: Arc<dyn KvStore>) -> Result<Self, StateError> {
        let height = store
            .get(HEIGHT_KEY)?
            .ok_or_else(|| StateError::NotFound("ledger height".into()))?;
        let mut state = Self::empty(store.clone());
        state.height = decode_u64(&height)?;
        state.timestamp = read_u64(store.as_ref(), TIMESTAMP_KEY)?;
        state.fee_pool = read_u64(store.as_ref(), FEE_POOL_KEY)?;

        for (key, value) in store.scan_prefix(CURRENT_SUPPLY_PREFIX)? {
            let supernet_id = parse_id_suffix(CURRENT_SUPPLY_PREFIX, &key)?;
            state.current_supply.insert(supernet_id, decode_u64(&value)?);
        }
        for (key, value) in store.scan_prefix(REWARD_POOL_PREFIX)? {
            let supernet_id = parse_id_suffix(REWARD_POOL_PREFIX, &key)?;
            state.reward_pool_supply.insert(supernet_id, decode_u64(&value)?);
        }
        load_stakers(store.as_ref(), CURRENT_STAKER_PREFIX, &mut state.current_stakers)?;
        load_stakers(store.as_ref(), PENDING_STAKER_PREFIX, &mut state.pending_stakers)?;

        tracing::info!(
            target: "state",
            height = state.height,
            timestamp = state.timestamp,
            current = state.current_stakers.len(),
            pending = state.pending_stakers.len(),
            "loaded ledger"
        );
        Ok(state)
    }

    /// The height of the last commit.
    pub fn height(&self) -> u64 {
        self.height
    }

    /// The store this state persists into.
    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    /// Returns `true` if writes are buffered that `commit` has not flushed.
    pub fn has_uncommitted_changes(&self) -> bool {
        !self.unflushed.is_empty()
            || self.current_stakers.has_changes()
            || self.pending_stakers.has_changes()
    }

    /// Flushes every buffered write as the state of `height`, which must
    /// directly follow the last committed height.
    pub fn commit(&mut self, height: u64) -> Result<(), StateError> {
        let expected = self.height.checked_add(1).ok_or_else(|| {
            StateError::Overflow(format!("height after {}", self.height))
        })?;
        if height != expected {
            return Err(StateError::InvariantViolation(format!(
                "commit of height {height}, expected {expected}"
            )));
        }
        self.flush(height)
    }

    fn flush(&mut self, height: u64) -> Result<(), StateError> {
        let mut batch = WriteBatch::default();
        batch.put(HEIGHT_KEY.to_vec(), be64(height).to_vec());
        batch.put(TIMESTAMP_KEY.to_vec(), be64(self.timestamp).to_vec());
        batch.put(FEE_POOL_KEY.to_vec(), be64(self.fee_pool).to_vec());

        for supernet_id in &self.unflushed.supplies {
            if let Some(supply) = self.current_supply.get(supernet_id) {
                batch.put(supply_key(supernet_id), be64(*supply).to_vec());
            }
        }
        for supernet_id in &self.unflushed.reward_pools {
            if let Some(supply) = self.reward_pool_supply.get(supernet_id) {
                batch.put(reward_pool_key(supernet_id), be64(*supply).to_vec());
            }
        }

        write_staker_diffs(&mut batch, CURRENT_STAKER_PREFIX, self.current_stakers.diffs());
        write_staker_diffs(&mut batch, PENDING_STAKER_PREFIX, self.pending_stakers.diffs());
        write_validator_diffs(&mut batch, height, self.current_stakers.diffs())?;

        for (id, utxo) in &self.unflushed.utxos {
            match utxo {
                Some(utxo) => batch.put(utxo_key(id), to_bytes_canonical(utxo)),
                None => batch.delete(utxo_key(id)),
            }
        }
        for (staker_tx_id, utxos) in &self.unflushed.reward_utxos {
            for utxo in utxos {
                batch.put(
                    reward_utxo_key(staker_tx_id, utxo.id.output_index),
                    to_bytes_canonical(utxo),
                );
            }
        }
        for (id, supernet) in &self.unflushed.supernets {
            batch.put(id_key(SUPERNET_PREFIX, id), to_bytes_canonical(supernet));
        }
        for (id, transformation) in &self.unflushed.transformations {
            batch.put(
                id_key(TRANSFORMATION_PREFIX, id),
                to_bytes_canonical(transformation),
            );
        }
        for (supernet_id, chains) in &self.unflushed.chains {
            for (chain_id, chain) in chains {
                batch.put(chain_key(supernet_id, chain_id), to_bytes_canonical(chain));
            }
        }
        for (id, tx) in &self.unflushed.txs {
            batch.put(id_key(TX_PREFIX, id), to_bytes_canonical(tx));
        }

        let writes = batch.len();
        self.store.write_batch(batch)?;

        self.height = height;
        self.current_stakers.clear_diffs();
        self.pending_stakers.clear_diffs();
        self.unflushed = Unflushed::default();
        tracing::info!(target: "state", height, writes, "committed ledger state");
        Ok(())
    }
}

fn read_u64(store: &dyn KvStore, key: &[u8]) -> Result<u64, StateError> {
    match store.get(key)? {
        Some(value) => decode_u64(&value),
        None => Err(StateError::NotFound(format!(
            "ledger record {}",
            String::from_utf8_lossy(key)
        ))),
    }
}

fn load_stakers(
    store: &dyn KvStore,
    prefix: &[u8],
    stakers: &mut BaseStakers,
) -> Result<(), StateError> {
    for (key, value) in store.scan_prefix(prefix)? {
        let tx_id = parse_id_suffix(prefix, &key)?;
        let staker: Staker = from_bytes_canonical(&value, "staker")?;
        if staker.tx_id != tx_id {
            return Err(StateError::Decode(format!(
                "staker {} stored under key of {}",
                staker.tx_id, tx_id
            )));
        }
        if staker.priority.is_validator() {
            stakers.put_validator(staker);
        } else {
            stakers.put_delegator(staker);
        }
    }
    stakers.clear_diffs();
    Ok(())
}

fn write_staker_diffs(batch: &mut WriteBatch, prefix: &[u8], diffs: &NodeMap<ValidatorDiff>) {
    for diff in diffs.values().flat_map(BTreeMap::values) {
        match (diff.status, diff.validator.as_ref()) {
            (DiffStatus::Added, Some(validator)) => {
                if let Some(superseded) = &diff.superseded {
                    batch.delete(id_key(prefix, &superseded.tx_id));
                }
                batch.put(id_key(prefix, &validator.tx_id), to_bytes_canonical(validator));
            }
            (DiffStatus::Deleted, Some(validator)) => {
                batch.delete(id_key(prefix, &validator.tx_id));
            }
            _ => {}
        }
        for delegator in diff.added_delegators.values() {
            batch.put(id_key(prefix, &delegator.tx_id), to_bytes_canonical(delegator));
        }
        for tx_id in diff.deleted_delegators.keys() {
            batch.delete(id_key(prefix, tx_id));
        }
    }
}

/// Records, for each touched validator of the current set, the net weight
/// change and the public key it held before `height`.
fn write_validator_diffs(
    batch: &mut WriteBatch,
    height: u64,
    diffs: &NodeMap<ValidatorDiff>,
) -> Result<(), StateError> {
    for (supernet_id, nodes) in diffs {
        for (node_id, diff) in nodes {
            let mut weight = ValidatorWeightDiff::default();
            let mut previous_key: Option<Option<&Vec<u8>>> = None;
            match (diff.status, diff.validator.as_ref()) {
                (DiffStatus::Added, Some(validator)) => {
                    let before = diff.superseded.as_ref();
                    if let Some(superseded) = before {
                        weight.add(true, superseded.weight)?;
                    }
                    weight.add(false, validator.weight)?;
                    let old = before.and_then(|s| s.public_key.as_ref());
                    if old != validator.public_key.as_ref() {
                        previous_key = Some(old);
                    }
                }
                (DiffStatus::Deleted, Some(validator)) => {
                    weight.add(true, validator.weight)?;
                    if validator.public_key.is_some() {
                        previous_key = Some(validator.public_key.as_ref());
                    }
                }
                _ => {}
            }
            for delegator in diff.added_delegators.values() {
                weight.add(false, delegator.weight)?;
            }
            for delegator in diff.deleted_delegators.values() {
                weight.add(true, delegator.weight)?;
            }

            if !weight.is_zero() {
                batch.put(
                    validator_diff_key(WEIGHT_DIFF_PREFIX, supernet_id, height, node_id),
                    to_bytes_canonical(&weight),
                );
            }
            if let Some(old) = previous_key {
                batch.put(
                    validator_diff_key(PUBLIC_KEY_DIFF_PREFIX, supernet_id, height, node_id),
                    to_bytes_canonical(&old.cloned()),
                );
            }
        }
    }
    Ok(())
}

impl Chain for State {
    fn timestamp(&self) -> u64 {
        self.timestamp
    }

    fn set_timestamp(&mut self, timestamp: u64) {
        self.timestamp = timestamp;
        self.unflushed.metadata = true;
    }

    fn current_supply(&self, supernet_id: &Id) -> Result<u64, StateError> {
        self.current_supply
            .get(supernet_id)
            .copied()
            .ok_or_else(|| StateError::NotFound(format!("current supply of {supernet_id}")))
    }

    fn set_current_supply(&mut self, supernet_id: &Id, supply: u64) {
        self.current_supply.insert(*supernet_id, supply);
        self.unflushed.supplies.insert(*supernet_id);
    }

    fn reward_pool_supply(&self, supernet_id: &Id) -> Result<u64, StateError> {
        self.reward_pool_supply
            .get(supernet_id)
            .copied()
            .ok_or_else(|| StateError::NotFound(format!("reward pool of {supernet_id}")))
    }

    fn set_reward_pool_supply(&mut self, supernet_id: &Id, supply: u64) {
        self.reward_pool_supply.insert(*supernet_id, supply);
        self.unflushed.reward_pools.insert(*supernet_id);
    }

    fn fee_pool(&self) -> u64 {
        self.fee_pool
    }

    fn set_fee_pool(&mut self, fee_pool: u64) {
        self.fee_pool = fee_pool;
        self.unflushed.metadata = true;
    }

    fn current_validator(
        &self,
        supernet_id: &Id,
        node_id: &NodeId,
    ) -> Result<Option<&Staker>, StateError> {
        Ok(self.current_stakers.get_validator(supernet_id, node_id))
    }

    fn put_current_validator(&mut self, staker: Staker) {
        self.current_stakers.put_validator(staker);
    }

    fn delete_current_validator(&mut self, staker: &Staker) {
        self.current_stakers.delete_validator(staker);
    }

    fn current_delegator_iterator(
        &self,
        supernet_id: &Id,
        node_id: &NodeId,
    ) -> Result<StakerIterator<'_>, StateError> {
        Ok(self.current_stakers.delegator_iterator(supernet_id, node_id))
    }

    fn put_current_delegator(&mut self, staker: Staker) {
        self.current_stakers.put_delegator(staker);
    }

    fn delete_current_delegator(&mut self, staker: &Staker) {
        self.current_stakers.delete_delegator(staker);
    }

    fn current_staker_iterator(&self) -> Result<StakerIterator<'_>, StateError> {
        Ok(self.current_stakers.staker_iterator())
    }

    fn pending_validator(
        &self,
        supernet_id: &Id,
        node_id: &NodeId,
    ) -> Result<Option<&Staker>, StateError> {
        Ok(self.pending_stakers.get_validator(supernet_id, node_id))
    }

    fn put_pending_validator(&mut self, staker: Staker) {
        self.pending_stakers.put_validator(staker);
    }

    fn delete_pending_validator(&mut self, staker: &Staker) {
        self.pending_stakers.delete_validator(staker);
    }

    fn pending_delegator_iterator(
        &self,
        supernet_id: &Id,
        node_id: &NodeId,
    ) -> Result<StakerIterator<'_>, StateError> {
        Ok(self.pending_stakers.delegator_iterator(supernet_id, node_id))
    }

    fn put_pending_delegator(&mut self, staker: Staker) {
        self.pending_stakers.put_delegator(staker);
    }

    fn delete_pending_delegator(&mut self, staker: &Staker) {
        self.pending_stakers.delete_delegator(staker);
    }

    fn pending_staker_iterator(&self) -> Result<StakerIterator<'_>, StateError> {
        Ok(self.pending_stakers.staker_iterator())
    }

    fn utxo(&self, id: &UtxoId) -> Result<Option<Utxo>, StateError> {
        if let Some(local) = self.unflushed.utxos.get(id) {
            return Ok(local.clone());
        }
        self.store
            .get(&utxo_key(id))?
            .map(|bytes| from_bytes_canonical(&bytes, "utxo"))
            .transpose()
    }

    fn add_utxo(&mut self, utxo: Utxo) {
        self.unflushed.utxos.insert(utxo.id, Some(utxo));
    }

    fn delete_utxo(&mut self, id: &UtxoId) {
        self.unflushed.utxos.insert(*id, None);
    }

    fn reward_utxos(&self, staker_tx_id: &Id) -> Result<Vec<Utxo>, StateError> {
        let mut utxos = self
            .store
            .scan_prefix(&id_key(REWARD_UTXO_PREFIX, staker_tx_id))?
            .into_iter()
            .map(|(_, bytes)| from_bytes_canonical(&bytes, "reward utxo"))
            .collect::<Result<Vec<Utxo>, _>>()?;
        if let Some(local) = self.unflushed.reward_utxos.get(staker_tx_id) {
            utxos.extend(local.iter().cloned());
        }
        Ok(utxos)
    }

    fn add_reward_utxo(&mut self, staker_tx_id: &Id, utxo: Utxo) {
        self.unflushed
            .reward_utxos
            .entry(*staker_tx_id)
            .or_default()
            .push(utxo);
    }

    fn supernet(&self, supernet_id: &Id) -> Result<Option<SupernetRecord>, StateError> {
        if let Some(local) = self.unflushed.supernets.get(supernet_id) {
            return Ok(Some(local.clone()));
        }
        self.store
            .get(&id_key(SUPERNET_PREFIX, supernet_id))?
            .map(|bytes| from_bytes_canonical(&bytes, "supernet"))
            .transpose()
    }

    fn add_supernet(&mut self, supernet: SupernetRecord) {
        self.unflushed.supernets.insert(supernet.id, supernet);
    }

    fn supernet_transformation(
        &self,
        supernet_id: &Id,
    ) -> Result<Option<SupernetTransformation>, StateError> {
        if let Some(local) = self.unflushed.transformations.get(supernet_id) {
            return Ok(Some(local.clone()));
        }
        self.store
            .get(&id_key(TRANSFORMATION_PREFIX, supernet_id))?
            .map(|bytes| from_bytes_canonical(&bytes, "supernet transformation"))
            .transpose()
    }

    fn add_supernet_transformation(&mut self, transformation: SupernetTransformation) {
        self.unflushed
            .transformations
            .insert(transformation.supernet_id, transformation);
    }

    fn chains(&self, supernet_id: &Id) -> Result<Vec<ChainRecord>, StateError> {
        let mut chains = BTreeMap::new();
        for (_, bytes) in self.store.scan_prefix(&id_key(CHAIN_PREFIX, supernet_id))? {
            let chain: ChainRecord = from_bytes_canonical(&bytes, "chain")?;
            chains.insert(chain.id, chain);
        }
        if let Some(local) = self.unflushed.chains.get(supernet_id) {
            chains.extend(local.iter().map(|(id, chain)| (*id, chain.clone())));
        }
        Ok(chains.into_values().collect())
    }

    fn add_chain(&mut self, chain: ChainRecord) {
        self.unflushed
            .chains
            .entry(chain.supernet_id)
            .or_default()
            .insert(chain.id, chain);
    }

    fn tx(&self, tx_id: &Id) -> Result<Option<(StoredTx, TxStatus)>, StateError> {
        if let Some(local) = self.unflushed.txs.get(tx_id) {
            return Ok(Some(local.clone()));
        }
        self.store
            .get(&id_key(TX_PREFIX, tx_id))?
            .map(|bytes| from_bytes_canonical(&bytes, "transaction"))
            .transpose()
    }

    fn add_tx(&mut self, tx: StoredTx, status: TxStatus) {
        self.unflushed.txs.insert(tx.id, (tx, status));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pchain_storage::MemoryStore;
    use pchain_types::keys::validator_diff_scan_start;
    use pchain_types::{Priority, StakerKind, StakerTx};

    fn validator_tx(id: u64, weight: u64) -> StakerTx {
        StakerTx {
            tx_id: Id::from_u64(id),
            kind: StakerKind::PrimaryValidator,
            node_id: NodeId([id as u8; 20]),
            supernet_id: PRIMARY_NETWORK_ID,
            public_key: Some(vec![id as u8; 4]),
            weight,
            start_time: 1_000,
            end_time: 1_000 + 30 * 24 * 3600,
            reward_owner: Id::from_u64(100 + id),
        }
    }

    fn genesis() -> Genesis {
        Genesis {
            timestamp: 1_000,
            initial_supply: 1_000_000,
            initial_reward_pool: 0,
            validators: vec![validator_tx(1, 2_000), validator_tx(2, 3_000)],
            ..Genesis::default()
        }
    }

    fn delegator(id: u64, node: u8, weight: u64) -> Staker {
        Staker {
            tx_id: Id::from_u64(id),
            node_id: NodeId([node; 20]),
            public_key: None,
            supernet_id: PRIMARY_NETWORK_ID,
            weight,
            start_time: 1_000,
            end_time: 2_000,
            potential_reward: 0,
            next_time: 2_000,
            priority: Priority::PrimaryNetworkDelegatorCurrent,
        }
    }

    #[test]
    fn test_genesis_then_load_restores_registry() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let state = State::from_genesis(store.clone(), &genesis(), &StakingConfig::default())
            .unwrap();
        assert_eq!(state.height(), 0);
        assert!(!state.has_uncommitted_changes());

        let loaded = State::load(store).unwrap();
        assert_eq!(loaded.timestamp(), 1_000);
        assert_eq!(loaded.current_staker_iterator().unwrap().count(), 2);
        let v = loaded
            .current_validator(&PRIMARY_NETWORK_ID, &NodeId([1u8; 20]))
            .unwrap()
            .unwrap();
        assert_eq!(v.weight, 2_000);
        assert!(v.potential_reward > 0);
        // An empty pool means the whole reward was minted.
        let minted: u64 = loaded
            .current_staker_iterator()
            .unwrap()
            .map(|s| s.potential_reward)
            .sum();
        assert_eq!(
            loaded.current_supply(&PRIMARY_NETWORK_ID).unwrap(),
            1_000_000 + minted
        );
        let (tx, status) = loaded.tx(&Id::from_u64(1)).unwrap().unwrap();
        assert_eq!(status, TxStatus::Committed);
        assert!(matches!(tx.body, TxBody::AddStaker(_)));
    }

    #[test]
    fn test_genesis_refuses_initialised_store() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        State::from_genesis(store.clone(), &genesis(), &StakingConfig::default()).unwrap();
        let err = State::from_genesis(store, &genesis(), &StakingConfig::default()).unwrap_err();
        assert!(matches!(err, StateError::InvariantViolation(_)));
    }

    #[test]
    fn test_load_of_empty_store_is_not_found() {
        let err = State::load(Arc::new(MemoryStore::new())).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_commit_requires_next_height() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let mut state =
            State::from_genesis(store, &genesis(), &StakingConfig::default()).unwrap();
        assert!(matches!(
            state.commit(2),
            Err(StateError::InvariantViolation(_))
        ));
        state.commit(1).unwrap();
        assert_eq!(state.height(), 1);
    }

    #[test]
    fn test_commit_persists_only_net_changes() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let mut state =
            State::from_genesis(store.clone(), &genesis(), &StakingConfig::default()).unwrap();

        let transient = delegator(50, 1, 10);
        state.put_current_delegator(transient.clone());
        state.delete_current_delegator(&transient);
        let kept = delegator(51, 1, 25);
        state.put_current_delegator(kept.clone());
        state.set_timestamp(1_500);
        assert!(state.has_uncommitted_changes());
        state.commit(1).unwrap();

        assert!(store
            .get(&id_key(CURRENT_STAKER_PREFIX, &transient.tx_id))
            .unwrap()
            .is_none());
        assert!(store
            .get(&id_key(CURRENT_STAKER_PREFIX, &kept.tx_id))
            .unwrap()
            .is_some());

        let weight_diffs = store
            .scan_prefix_from(
                &id_key(WEIGHT_DIFF_PREFIX, &PRIMARY_NETWORK_ID),
                &validator_diff_scan_start(WEIGHT_DIFF_PREFIX, &PRIMARY_NETWORK_ID, 1),
            )
            .unwrap();
        let at_one: Vec<_> = weight_diffs
            .iter()
            .filter(|(k, _)| {
                pchain_types::keys::parse_validator_diff_key(WEIGHT_DIFF_PREFIX, k)
                    .map(|(_, h, _)| h == 1)
                    .unwrap_or(false)
            })
            .collect();
        assert_eq!(at_one.len(), 1);
        let diff: ValidatorWeightDiff = from_bytes_canonical(&at_one[0].1, "weight diff").unwrap();
        assert_eq!(
            diff,
            ValidatorWeightDiff {
                decrease: false,
                amount: 25
            }
        );

        let loaded = State::load(store).unwrap();
        assert_eq!(loaded.height(), 1);
        assert_eq!(loaded.timestamp(), 1_500);
        assert_eq!(
            loaded
                .current_delegator_iterator(&PRIMARY_NETWORK_ID, &NodeId([1u8; 20]))
                .unwrap()
                .count(),
            1
        );
    }

    #[test]
    fn test_records_read_through_until_committed() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let mut state =
            State::from_genesis(store.clone(), &genesis(), &StakingConfig::default()).unwrap();
        let utxo = Utxo {
            id: UtxoId {
                tx_id: Id::from_u64(9),
                output_index: 0,
            },
            asset_id: Id::EMPTY,
            amount: 5,
            owner: Id::from_u64(1),
        };
        state.add_utxo(utxo.clone());
        assert_eq!(state.utxo(&utxo.id).unwrap(), Some(utxo.clone()));
        assert!(store.get(&utxo_key(&utxo.id)).unwrap().is_none());
        state.commit(1).unwrap();
        assert_eq!(state.utxo(&utxo.id).unwrap(), Some(utxo.clone()));

        state.delete_utxo(&utxo.id);
        assert_eq!(state.utxo(&utxo.id).unwrap(), None);
        state.commit(2).unwrap();
        assert!(store.get(&utxo_key(&utxo.id)).unwrap().is_none());
    }

    #[test]
    fn test_malformed_staker_key_is_a_decode_error() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        State::from_genesis(store.clone(), &genesis(), &StakingConfig::default()).unwrap();
        let mut batch = WriteBatch::default();
        batch.put([CURRENT_STAKER_PREFIX, b"short"].concat(), vec![0u8; 4]);
        store.write_batch(batch).unwrap();
        assert!(matches!(State::load(store), Err(StateError::Decode(_))));
    }

    #[test]
    fn test_missing_supply_is_not_found() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let state = State::from_genesis(store, &genesis(), &StakingConfig::default()).unwrap();
        assert!(state.current_supply(&Id::from_u64(77)).unwrap_err().is_not_found());
        assert!(state
            .reward_pool_supply(&Id::from_u64(77))
            .unwrap_err()
            .is_not_found());
    }
}
