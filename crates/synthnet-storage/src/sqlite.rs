//! SQLite storage backend
//!
//! Every statement is parameterized. The only text spliced into SQL is the
//! name of a per-synapse-type parameter table, which is validated as a plain
//! identifier and must belong to a registered synapse type.

use crate::{
    error::{Result, StorageError},
    ids::{ConnectionGroupId, DeviceComponentId, NeuronGroupId, NeuronId, SynapseTypeId},
    records::{
        Connection, ConnectionGroup, ConnectionGroupSpec, DeviceComponent, Neuron, NeuronGroup,
        NeuronGroupSpec, Position, Receptor, SynapseType,
    },
    traits::{NetworkStore, NeuronQuery},
};

use log::debug;
use parking_lot::Mutex;
use rusqlite::{params, params_from_iter, Connection as SqlConnection, OptionalExtension, Row};
use std::ops::Bound;
use std::path::Path;
use std::sync::Arc;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS NeuronGroups (
        NeuronGrpID INTEGER PRIMARY KEY AUTOINCREMENT,
        X INTEGER NOT NULL,
        Y INTEGER NOT NULL,
        Z INTEGER NOT NULL,
        Width INTEGER NOT NULL,
        Length INTEGER NOT NULL,
        Spacing INTEGER NOT NULL,
        NeuronType INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS Neurons (
        NeuronID INTEGER PRIMARY KEY AUTOINCREMENT,
        X INTEGER NOT NULL,
        Y INTEGER NOT NULL,
        Z INTEGER NOT NULL,
        NeuronGrpID INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_neurons_group_pos ON Neurons(NeuronGrpID, Z, X, Y);
    CREATE INDEX IF NOT EXISTS idx_neurons_pos ON Neurons(Z, X, Y);
    CREATE TABLE IF NOT EXISTS ConnectionGroups (
        ConnGrpID INTEGER PRIMARY KEY AUTOINCREMENT,
        FromNeuronGrpID INTEGER NOT NULL,
        ToNeuronGrpID INTEGER NOT NULL,
        ConnType INTEGER NOT NULL,
        SynapseType INTEGER NOT NULL,
        Parameters TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_conngroups_triple
        ON ConnectionGroups(FromNeuronGrpID, ToNeuronGrpID, ConnType);
    CREATE TABLE IF NOT EXISTS Connections (
        PreSynapticNeuronID INTEGER NOT NULL,
        PostSynapticNeuronID INTEGER NOT NULL,
        Delay INTEGER NOT NULL,
        Weight INTEGER NOT NULL,
        ConnGrpID INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_connections_pair
        ON Connections(PreSynapticNeuronID, PostSynapticNeuronID);
    CREATE INDEX IF NOT EXISTS idx_connections_group ON Connections(ConnGrpID);
    CREATE TABLE IF NOT EXISTS SynapseTypes (
        TypeID INTEGER PRIMARY KEY,
        Description TEXT NOT NULL,
        ParameterTableName TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS DeviceComponents (
        ComponentID INTEGER PRIMARY KEY,
        Description TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS DeviceReceptors (
        ComponentID INTEGER NOT NULL,
        Position INTEGER NOT NULL,
        ReceptorID INTEGER NOT NULL,
        Rows INTEGER NOT NULL,
        PRIMARY KEY (ComponentID, Position)
    );
";

/// SQLite-backed network store
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<SqlConnection>>,
}

impl SqliteStore {
    /// Open (or create) a database file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = SqlConnection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA temp_store=memory;",
        )?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory database
    pub fn in_memory() -> Result<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(SqlConnection::open_in_memory()?)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.lock().execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Parameter table names may only be used once a synapse type has registered them
    fn checked_table(&self, conn: &SqlConnection, table: &str) -> Result<()> {
        SynapseType::validate_table_name(table)?;
        let known: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM SynapseTypes WHERE ParameterTableName = ?1)",
            params![table],
            |row| row.get(0),
        )?;
        if known {
            Ok(())
        } else {
            Err(StorageError::invalid_table_name(table))
        }
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

fn neuron_group_from_row(row: &Row<'_>) -> rusqlite::Result<NeuronGroup> {
    Ok(NeuronGroup {
        id: NeuronGroupId::new(row.get(0)?),
        position: Position::new(row.get(1)?, row.get(2)?, row.get(3)?),
        width: row.get(4)?,
        length: row.get(5)?,
        spacing: row.get(6)?,
        neuron_type: row.get(7)?,
    })
}

fn neuron_from_row(row: &Row<'_>) -> rusqlite::Result<Neuron> {
    Ok(Neuron {
        id: NeuronId::new(row.get(0)?),
        position: Position::new(row.get(1)?, row.get(2)?, row.get(3)?),
        group: NeuronGroupId::new(row.get(4)?),
    })
}

fn connection_group_from_row(row: &Row<'_>) -> rusqlite::Result<ConnectionGroup> {
    Ok(ConnectionGroup {
        id: ConnectionGroupId::new(row.get(0)?),
        from_group: NeuronGroupId::new(row.get(1)?),
        to_group: NeuronGroupId::new(row.get(2)?),
        connection_type: row.get(3)?,
        synapse_type: SynapseTypeId::new(row.get(4)?),
        parameters: row.get(5)?,
    })
}

fn connection_from_row(row: &Row<'_>) -> rusqlite::Result<Connection> {
    Ok(Connection {
        pre: NeuronId::new(row.get(0)?),
        post: NeuronId::new(row.get(1)?),
        delay: row.get(2)?,
        weight: row.get(3)?,
        group: ConnectionGroupId::new(row.get(4)?),
    })
}

fn push_bounds(
    column: &str,
    bounds: &(Bound<i32>, Bound<i32>),
    sql: &mut String,
    values: &mut Vec<i64>,
) {
    match bounds.0 {
        Bound::Included(b) => {
            sql.push_str(&format!(" AND {} >= ?", column));
            values.push(i64::from(b));
        }
        Bound::Excluded(b) => {
            sql.push_str(&format!(" AND {} > ?", column));
            values.push(i64::from(b));
        }
        Bound::Unbounded => {}
    }
    match bounds.1 {
        Bound::Included(b) => {
            sql.push_str(&format!(" AND {} <= ?", column));
            values.push(i64::from(b));
        }
        Bound::Excluded(b) => {
            sql.push_str(&format!(" AND {} < ?", column));
            values.push(i64::from(b));
        }
        Bound::Unbounded => {}
    }
}

impl NetworkStore for SqliteStore {
    fn insert_neuron_group(&mut self, spec: &NeuronGroupSpec) -> Result<NeuronGroupId> {
        spec.validate()?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO NeuronGroups (X, Y, Z, Width, Length, Spacing, NeuronType)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                spec.position.x,
                spec.position.y,
                spec.position.z,
                spec.width,
                spec.length,
                spec.spacing,
                spec.neuron_type
            ],
        )?;
        let id = conn.last_insert_rowid();
        u32::try_from(id)
            .map(NeuronGroupId::new)
            .map_err(|_| StorageError::OutOfRange { column: "NeuronGrpID", value: id })
    }

    fn neuron_group(&self, id: NeuronGroupId) -> Result<Option<NeuronGroup>> {
        let conn = self.conn.lock();
        let group = conn
            .query_row(
                "SELECT NeuronGrpID, X, Y, Z, Width, Length, Spacing, NeuronType
                 FROM NeuronGroups WHERE NeuronGrpID = ?1",
                params![id.raw()],
                neuron_group_from_row,
            )
            .optional()?;
        Ok(group)
    }

    fn neuron_groups(&self) -> Result<Vec<NeuronGroup>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT NeuronGrpID, X, Y, Z, Width, Length, Spacing, NeuronType
             FROM NeuronGroups ORDER BY NeuronGrpID",
        )?;
        let groups = stmt
            .query_map([], neuron_group_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(groups)
    }

    fn delete_neuron_group(&mut self, id: NeuronGroupId) -> Result<()> {
        let conn = self.conn.lock();
        let remaining: i64 = conn.query_row(
            "SELECT COUNT(*) FROM Neurons WHERE NeuronGrpID = ?1",
            params![id.raw()],
            |row| row.get(0),
        )?;
        if remaining > 0 {
            return Err(StorageError::invalid_record(format!(
                "neuron group {} still has {} neurons",
                id, remaining
            )));
        }
        let deleted = conn.execute(
            "DELETE FROM NeuronGroups WHERE NeuronGrpID = ?1",
            params![id.raw()],
        )?;
        if deleted == 0 {
            return Err(StorageError::not_found("NeuronGroup", id.raw()));
        }
        Ok(())
    }

    fn insert_neuron(&mut self, position: Position, group: NeuronGroupId) -> Result<NeuronId> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO Neurons (X, Y, Z, NeuronGrpID) VALUES (?1, ?2, ?3, ?4)",
            params![position.x, position.y, position.z, group.raw()],
        )?;
        let id = conn.last_insert_rowid();
        u32::try_from(id)
            .map(NeuronId::new)
            .map_err(|_| StorageError::OutOfRange { column: "NeuronID", value: id })
    }

    fn delete_neurons(&mut self, group: NeuronGroupId) -> Result<u64> {
        let deleted = self
            .conn
            .lock()
            .execute("DELETE FROM Neurons WHERE NeuronGrpID = ?1", params![group.raw()])?;
        Ok(deleted as u64)
    }

    fn find_neurons(&self, query: &NeuronQuery) -> Result<Vec<Neuron>> {
        let mut sql =
            String::from("SELECT NeuronID, X, Y, Z, NeuronGrpID FROM Neurons WHERE 1 = 1");
        let mut values: Vec<i64> = Vec::with_capacity(6);
        if let Some(group) = query.group {
            sql.push_str(" AND NeuronGrpID = ?");
            values.push(i64::from(group.raw()));
        }
        if let Some(z) = query.z {
            sql.push_str(" AND Z = ?");
            values.push(i64::from(z));
        }
        push_bounds("X", &query.x, &mut sql, &mut values);
        push_bounds("Y", &query.y, &mut sql, &mut values);
        sql.push_str(" ORDER BY NeuronID");

        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(&sql)?;
        let neurons = stmt
            .query_map(params_from_iter(values.iter()), neuron_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(neurons)
    }

    fn neuron_page(
        &self,
        group: NeuronGroupId,
        after: Option<NeuronId>,
        limit: usize,
    ) -> Result<Vec<Neuron>> {
        let after = after.map_or(0i64, |id| i64::from(id.raw()));
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT NeuronID, X, Y, Z, NeuronGrpID FROM Neurons
             WHERE NeuronGrpID = ?1 AND NeuronID > ?2
             ORDER BY NeuronID LIMIT ?3",
        )?;
        let neurons = stmt
            .query_map(params![group.raw(), after, limit as i64], neuron_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(neurons)
    }

    fn neuron_id_range(&self, group: NeuronGroupId) -> Result<Option<(NeuronId, NeuronId)>> {
        let conn = self.conn.lock();
        let (min, max): (Option<u32>, Option<u32>) = conn.query_row(
            "SELECT MIN(NeuronID), MAX(NeuronID) FROM Neurons WHERE NeuronGrpID = ?1",
            params![group.raw()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(min.zip(max).map(|(a, b)| (NeuronId::new(a), NeuronId::new(b))))
    }

    fn neuron_count(&self, group: NeuronGroupId) -> Result<u64> {
        let count: i64 = self.conn.lock().query_row(
            "SELECT COUNT(*) FROM Neurons WHERE NeuronGrpID = ?1",
            params![group.raw()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn find_connection_group(
        &self,
        from: NeuronGroupId,
        to: NeuronGroupId,
        connection_type: u16,
    ) -> Result<Option<ConnectionGroupId>> {
        let conn = self.conn.lock();
        let id: Option<u32> = conn
            .query_row(
                "SELECT ConnGrpID FROM ConnectionGroups
                 WHERE FromNeuronGrpID = ?1 AND ToNeuronGrpID = ?2 AND ConnType = ?3
                 ORDER BY ConnGrpID LIMIT 1",
                params![from.raw(), to.raw(), connection_type],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id.map(ConnectionGroupId::new))
    }

    fn insert_connection_group(&mut self, spec: &ConnectionGroupSpec) -> Result<ConnectionGroupId> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO ConnectionGroups
                 (FromNeuronGrpID, ToNeuronGrpID, ConnType, SynapseType, Parameters)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                spec.from_group.raw(),
                spec.to_group.raw(),
                spec.connection_type,
                spec.synapse_type.raw(),
                spec.parameters
            ],
        )?;
        let id = conn.last_insert_rowid();
        u32::try_from(id)
            .map(ConnectionGroupId::new)
            .map_err(|_| StorageError::OutOfRange { column: "ConnGrpID", value: id })
    }

    fn connection_group(&self, id: ConnectionGroupId) -> Result<Option<ConnectionGroup>> {
        let conn = self.conn.lock();
        let group = conn
            .query_row(
                "SELECT ConnGrpID, FromNeuronGrpID, ToNeuronGrpID, ConnType, SynapseType, Parameters
                 FROM ConnectionGroups WHERE ConnGrpID = ?1",
                params![id.raw()],
                connection_group_from_row,
            )
            .optional()?;
        Ok(group)
    }

    fn connection_groups(&self) -> Result<Vec<ConnectionGroup>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT ConnGrpID, FromNeuronGrpID, ToNeuronGrpID, ConnType, SynapseType, Parameters
             FROM ConnectionGroups ORDER BY ConnGrpID",
        )?;
        let groups = stmt
            .query_map([], connection_group_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(groups)
    }

    fn delete_connection_group(&mut self, id: ConnectionGroupId) -> Result<()> {
        self.conn
            .lock()
            .execute("DELETE FROM ConnectionGroups WHERE ConnGrpID = ?1", params![id.raw()])?;
        Ok(())
    }

    fn connection_exists(&self, pre: NeuronId, post: NeuronId) -> Result<bool> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT EXISTS(SELECT 1 FROM Connections
             WHERE PreSynapticNeuronID = ?1 AND PostSynapticNeuronID = ?2)",
        )?;
        let exists: bool = stmt.query_row(params![pre.raw(), post.raw()], |row| row.get(0))?;
        Ok(exists)
    }

    fn insert_connection(&mut self, connection: &Connection) -> Result<()> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "INSERT INTO Connections
                 (PreSynapticNeuronID, PostSynapticNeuronID, Delay, Weight, ConnGrpID)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        stmt.execute(params![
            connection.pre.raw(),
            connection.post.raw(),
            connection.delay,
            connection.weight,
            connection.group.raw()
        ])?;
        Ok(())
    }

    fn connections(&self, group: ConnectionGroupId) -> Result<Vec<Connection>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT PreSynapticNeuronID, PostSynapticNeuronID, Delay, Weight, ConnGrpID
             FROM Connections WHERE ConnGrpID = ?1
             ORDER BY PreSynapticNeuronID, PostSynapticNeuronID",
        )?;
        let connections = stmt
            .query_map(params![group.raw()], connection_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(connections)
    }

    fn connection_count(&self, group: ConnectionGroupId) -> Result<u64> {
        let count: i64 = self.conn.lock().query_row(
            "SELECT COUNT(*) FROM Connections WHERE ConnGrpID = ?1",
            params![group.raw()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn outgoing_weights(&self, pre: NeuronId) -> Result<Vec<i8>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT Weight FROM Connections WHERE PreSynapticNeuronID = ?1",
        )?;
        let weights = stmt
            .query_map(params![pre.raw()], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i8>>>()?;
        Ok(weights)
    }

    fn delete_connections(&mut self, group: ConnectionGroupId) -> Result<u64> {
        let deleted = self
            .conn
            .lock()
            .execute("DELETE FROM Connections WHERE ConnGrpID = ?1", params![group.raw()])?;
        Ok(deleted as u64)
    }

    fn register_synapse_type(&mut self, synapse_type: &SynapseType) -> Result<()> {
        SynapseType::validate_table_name(&synapse_type.parameter_table)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO SynapseTypes (TypeID, Description, ParameterTableName)
             VALUES (?1, ?2, ?3)",
            params![
                synapse_type.id.raw(),
                synapse_type.description,
                synapse_type.parameter_table
            ],
        )?;
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (ConnGrpID INTEGER PRIMARY KEY)",
            synapse_type.parameter_table
        ))?;
        debug!(
            "Registered synapse type {} with parameter table {}",
            synapse_type.id, synapse_type.parameter_table
        );
        Ok(())
    }

    fn synapse_types(&self) -> Result<Vec<SynapseType>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT TypeID, Description, ParameterTableName FROM SynapseTypes ORDER BY TypeID",
        )?;
        let types = stmt
            .query_map([], |row| {
                Ok(SynapseType {
                    id: SynapseTypeId::new(row.get(0)?),
                    description: row.get(1)?,
                    parameter_table: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(types)
    }

    fn synapse_type(&self, id: SynapseTypeId) -> Result<Option<SynapseType>> {
        let conn = self.conn.lock();
        let synapse_type = conn
            .query_row(
                "SELECT TypeID, Description, ParameterTableName
                 FROM SynapseTypes WHERE TypeID = ?1",
                params![id.raw()],
                |row| {
                    Ok(SynapseType {
                        id: SynapseTypeId::new(row.get(0)?),
                        description: row.get(1)?,
                        parameter_table: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(synapse_type)
    }

    fn insert_synapse_parameters(&mut self, table: &str, group: ConnectionGroupId) -> Result<()> {
        let conn = self.conn.lock();
        self.checked_table(&conn, table)?;
        conn.execute(
            &format!("INSERT OR REPLACE INTO \"{}\" (ConnGrpID) VALUES (?1)", table),
            params![group.raw()],
        )?;
        Ok(())
    }

    fn delete_synapse_parameters(&mut self, table: &str, group: ConnectionGroupId) -> Result<u64> {
        let conn = self.conn.lock();
        self.checked_table(&conn, table)?;
        let deleted = conn.execute(
            &format!("DELETE FROM \"{}\" WHERE ConnGrpID = ?1", table),
            params![group.raw()],
        )?;
        Ok(deleted as u64)
    }

    fn has_synapse_parameters(&self, table: &str, group: ConnectionGroupId) -> Result<bool> {
        let conn = self.conn.lock();
        self.checked_table(&conn, table)?;
        let exists: bool = conn.query_row(
            &format!("SELECT EXISTS(SELECT 1 FROM \"{}\" WHERE ConnGrpID = ?1)", table),
            params![group.raw()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn insert_device_component(&mut self, component: &DeviceComponent) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO DeviceComponents (ComponentID, Description) VALUES (?1, ?2)",
            params![component.id.raw(), component.description],
        )?;
        tx.execute(
            "DELETE FROM DeviceReceptors WHERE ComponentID = ?1",
            params![component.id.raw()],
        )?;
        for (position, receptor) in component.receptors.iter().enumerate() {
            tx.execute(
                "INSERT INTO DeviceReceptors (ComponentID, Position, ReceptorID, Rows)
                 VALUES (?1, ?2, ?3, ?4)",
                params![component.id.raw(), position as i64, receptor.id, receptor.rows],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn device_component(&self, id: DeviceComponentId) -> Result<Option<DeviceComponent>> {
        let conn = self.conn.lock();
        let description: Option<String> = conn
            .query_row(
                "SELECT Description FROM DeviceComponents WHERE ComponentID = ?1",
                params![id.raw()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(description) = description else {
            return Ok(None);
        };
        let mut stmt = conn.prepare(
            "SELECT ReceptorID, Rows FROM DeviceReceptors WHERE ComponentID = ?1 ORDER BY Position",
        )?;
        let receptors = stmt
            .query_map(params![id.raw()], |row| {
                Ok(Receptor {
                    id: row.get(0)?,
                    rows: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Some(DeviceComponent {
            id,
            description,
            receptors,
        }))
    }

    fn insert_lattice_group(&mut self, spec: &NeuronGroupSpec) -> Result<NeuronGroup> {
        spec.validate()?;
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO NeuronGroups (X, Y, Z, Width, Length, Spacing, NeuronType)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                spec.position.x,
                spec.position.y,
                spec.position.z,
                spec.width,
                spec.length,
                spec.spacing,
                spec.neuron_type
            ],
        )?;
        let raw_id = tx.last_insert_rowid();
        let id = u32::try_from(raw_id)
            .map(NeuronGroupId::new)
            .map_err(|_| StorageError::OutOfRange { column: "NeuronGrpID", value: raw_id })?;
        let group = NeuronGroup::from_spec(id, spec);
        {
            let mut stmt = tx.prepare(
                "INSERT INTO Neurons (X, Y, Z, NeuronGrpID) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for row in 0..group.length {
                for col in 0..group.width {
                    let p = group.lattice_position(col, row);
                    stmt.execute(params![p.x, p.y, p.z, id.raw()])?;
                }
            }
        }
        tx.commit()?;
        debug!("Inserted lattice group {} with {} neurons", id, group.neuron_count());
        Ok(group)
    }
}
