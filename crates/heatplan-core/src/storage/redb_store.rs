//! redb-backed result store.

use crate::kpi::KpiRecord;
use crate::scenario::Scenario;
use crate::simulation::SimulationResult;
use crate::{HeatplanError, Result};
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Every table maps a scenario name (or meta key) to postcard bytes.
type Table = TableDefinition<'static, &'static str, &'static [u8]>;

const SCENARIOS: Table = TableDefinition::new("scenarios");
const RESULTS: Table = TableDefinition::new("results");
const KPIS: Table = TableDefinition::new("kpis");
const META: Table = TableDefinition::new("meta");

const TABLES: [Table; 4] = [SCENARIOS, RESULTS, KPIS, META];

/// Meta key holding the scenario definition order.
const ORDER_KEY: &str = "scenario_order";

// =============================================================================
// ERROR CONVERSIONS
// =============================================================================

macro_rules! storage_error {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for HeatplanError {
                fn from(err: $ty) -> Self {
                    Self::Storage(err.to_string())
                }
            }
        )*
    };
}

storage_error!(
    redb::Error,
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

// =============================================================================
// STORE
// =============================================================================

/// Row counts of a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStatus {
    pub scenarios: u64,
    pub results: u64,
    pub successful_results: u64,
    pub kpis: u64,
}

/// Scenario, result and KPI tables in one redb file.
pub struct ResultStore {
    db: Database,
}

impl std::fmt::Debug for ResultStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultStore").finish_non_exhaustive()
    }
}

impl ResultStore {
    /// Create a store, or open it if the file exists.
    pub fn create(path: &Path) -> Result<Self> {
        let db = Database::create(path)?;
        let store = Self { db };
        store.ensure_tables()?;
        Ok(store)
    }

    /// Open an existing store.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(HeatplanError::Storage(format!(
                "database not found: {}",
                path.display()
            )));
        }
        let db = Database::open(path)?;
        let store = Self { db };
        store.ensure_tables()?;
        Ok(store)
    }

    fn ensure_tables(&self) -> Result<()> {
        let txn = self.db.begin_write()?;
        for table in TABLES {
            txn.open_table(table)?;
        }
        txn.commit()?;
        Ok(())
    }

    fn put_all<'a, T: Serialize + 'a>(
        &self,
        table: Table,
        items: impl IntoIterator<Item = (&'a str, &'a T)>,
    ) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut t = txn.open_table(table)?;
            for (key, value) in items {
                let bytes = postcard::to_allocvec(value)?;
                t.insert(key, bytes.as_slice())?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(
        &self,
        table: Table,
        key: &str,
    ) -> Result<Option<T>> {
        let txn = self.db.begin_read()?;
        let t = txn.open_table(table)?;
        match t.get(key)? {
            Some(guard) => Ok(Some(postcard::from_bytes(guard.value())?)),
            None => Ok(None),
        }
    }

    /// All values of a table, in scenario definition order.
    fn list<T: DeserializeOwned>(&self, table: Table) -> Result<Vec<T>> {
        let order: Vec<String> = self.get(META, ORDER_KEY)?.unwrap_or_default();
        let txn = self.db.begin_read()?;
        let t = txn.open_table(table)?;
        let mut rows = Vec::new();
        for entry in t.iter()? {
            let (key, value) = entry?;
            let name = key.value().to_string();
            let rank = order.iter().position(|n| *n == name).unwrap_or(usize::MAX);
            rows.push((rank, name, postcard::from_bytes::<T>(value.value())?));
        }
        rows.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));
        Ok(rows.into_iter().map(|(_, _, v)| v).collect())
    }

    /// Replace the stored scenario set. Results and KPIs of scenarios no
    /// longer defined are dropped.
    pub fn put_scenarios(&self, scenarios: &[Scenario]) -> Result<()> {
        let names: Vec<String> = scenarios.iter().map(|s| s.name.clone()).collect();
        let txn = self.db.begin_write()?;
        {
            let mut t = txn.open_table(SCENARIOS)?;
            t.retain(|_, _| false)?;
            for scenario in scenarios {
                let bytes = postcard::to_allocvec(scenario)?;
                t.insert(scenario.name.as_str(), bytes.as_slice())?;
            }
            for table in [RESULTS, KPIS] {
                let mut t = txn.open_table(table)?;
                t.retain(|key, _| names.iter().any(|n| n == key))?;
            }
            let mut meta = txn.open_table(META)?;
            let order = postcard::to_allocvec(&names)?;
            meta.insert(ORDER_KEY, order.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn put_scenario(&self, scenario: &Scenario) -> Result<()> {
        let mut order: Vec<String> = self.get(META, ORDER_KEY)?.unwrap_or_default();
        if !order.contains(&scenario.name) {
            order.push(scenario.name.clone());
            self.put_all(META, [(ORDER_KEY, &order)])?;
        }
        self.put_all(SCENARIOS, [(scenario.name.as_str(), scenario)])
    }

    pub fn put_result(&self, result: &SimulationResult) -> Result<()> {
        self.put_results(std::slice::from_ref(result))
    }

    /// Store simulation results. KPIs computed from earlier results are
    /// dropped, so `kpis` is empty until they are recomputed.
    pub fn put_results(&self, results: &[SimulationResult]) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut t = txn.open_table(RESULTS)?;
            for result in results {
                let bytes = postcard::to_allocvec(result)?;
                t.insert(result.scenario.as_str(), bytes.as_slice())?;
            }
            txn.open_table(KPIS)?.retain(|_, _| false)?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn put_kpi(&self, kpi: &KpiRecord) -> Result<()> {
        self.put_all(KPIS, [(kpi.scenario.as_str(), kpi)])
    }

    pub fn put_kpis(&self, kpis: &[KpiRecord]) -> Result<()> {
        self.put_all(KPIS, kpis.iter().map(|k| (k.scenario.as_str(), k)))
    }

    pub fn get_scenario(&self, name: &str) -> Result<Option<Scenario>> {
        self.get(SCENARIOS, name)
    }

    pub fn get_result(&self, name: &str) -> Result<Option<SimulationResult>> {
        self.get(RESULTS, name)
    }

    pub fn get_kpi(&self, name: &str) -> Result<Option<KpiRecord>> {
        self.get(KPIS, name)
    }

    pub fn list_scenarios(&self) -> Result<Vec<Scenario>> {
        self.list(SCENARIOS)
    }

    pub fn list_results(&self) -> Result<Vec<SimulationResult>> {
        self.list(RESULTS)
    }

    pub fn list_kpis(&self) -> Result<Vec<KpiRecord>> {
        self.list(KPIS)
    }

    /// Store a free-form metadata string.
    pub fn put_meta(&self, key: &str, value: &str) -> Result<()> {
        self.put_all(META, [(key, &value.to_string())])
    }

    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        self.get(META, key)
    }

    pub fn status(&self) -> Result<StoreStatus> {
        let txn = self.db.begin_read()?;
        let successful_results = self
            .list_results()?
            .iter()
            .filter(|r| r.success)
            .count() as u64;
        Ok(StoreStatus {
            scenarios: txn.open_table(SCENARIOS)?.len()?,
            results: txn.open_table(RESULTS)?.len()?,
            successful_results,
            kpis: txn.open_table(KPIS)?.len()?,
        })
    }

    /// Drop every table and recreate them empty.
    pub fn clear(&self) -> Result<()> {
        let txn = self.db.begin_write()?;
        for table in TABLES {
            txn.delete_table(table)?;
            txn.open_table(table)?;
        }
        txn.commit()?;
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
