use std::error::Error;
use std::ops::Bound;

use synthnet_storage::{
    default_synapse_types, Connection, ConnectionGroupSpec, MemoryStore, NetworkStore, NeuronCursor,
    NeuronGroupSpec, NeuronId, NeuronQuery, Position, SqliteStore, SynapseTypeId,
};
use tempfile::tempdir;

fn lattice(x: i32, width: u32, length: u32) -> NeuronGroupSpec {
    NeuronGroupSpec {
        position: Position::new(x, 0, 0),
        width,
        length,
        spacing: 1,
        neuron_type: 1,
    }
}

fn check_lattice_and_queries(store: &mut dyn NetworkStore) -> Result<(), Box<dyn Error>> {
    let a = store.insert_lattice_group(&lattice(0, 5, 4))?;
    let b = store.insert_lattice_group(&lattice(100, 3, 3))?;

    assert_eq!(store.neuron_count(a.id)?, 20);
    let (min, max) = store.neuron_id_range(a.id)?.expect("group has neurons");
    assert_eq!(max.raw() - min.raw() + 1, 20);

    // lattice order: x fastest, then y
    let first_row = store.find_neurons(&NeuronQuery::in_group(a.id).y_range(0, 1))?;
    let xs: Vec<i32> = first_row.iter().map(|n| n.position.x).collect();
    assert_eq!(xs, vec![0, 1, 2, 3, 4]);
    assert_eq!(first_row[0].id, min);

    let window = NeuronQuery::anywhere()
        .x_bounds(Bound::Excluded(1), Bound::Included(3))
        .y_bounds(Bound::Included(1), Bound::Excluded(3));
    let found = store.find_neurons(&window)?;
    assert_eq!(found.len(), 4);
    assert!(found.windows(2).all(|w| w[0].id < w[1].id));

    let far = store.find_neurons(&NeuronQuery::anywhere().x_range(100, 200))?;
    assert_eq!(far.len(), 9);
    assert!(far.iter().all(|n| n.group == b.id));

    let mut cursor = NeuronCursor::with_page_size(a.id, 3);
    let mut seen = 0;
    let mut last: Option<NeuronId> = None;
    while let Some(n) = cursor.next_neuron(store)? {
        assert!(last.map_or(true, |l| l < n.id));
        last = Some(n.id);
        seen += 1;
    }
    assert_eq!(seen, 20);
    Ok(())
}

fn check_connection_lifecycle(store: &mut dyn NetworkStore) -> Result<(), Box<dyn Error>> {
    for t in default_synapse_types() {
        store.register_synapse_type(&t)?;
    }
    let g = store.insert_lattice_group(&lattice(0, 2, 1))?;
    let (pre, post) = store.neuron_id_range(g.id)?.expect("group has neurons");

    let spec = ConnectionGroupSpec {
        from_group: g.id,
        to_group: g.id,
        connection_type: 5,
        synapse_type: SynapseTypeId::new(1),
        parameters: "<connection_parameters/>".to_string(),
    };
    let cg = store.insert_connection_group(&spec)?;
    assert_eq!(store.find_connection_group(g.id, g.id, 5)?, Some(cg));
    assert_eq!(store.find_connection_group(g.id, g.id, 4)?, None);

    store.insert_connection(&Connection { pre, post, delay: 3, weight: -12, group: cg })?;
    assert!(store.connection_exists(pre, post)?);
    assert!(!store.connection_exists(post, pre)?);
    assert_eq!(store.outgoing_weights(pre)?, vec![-12]);
    assert_eq!(store.connection_count(cg)?, 1);

    let table = store
        .synapse_type(SynapseTypeId::new(1))?
        .expect("registered")
        .parameter_table;
    store.insert_synapse_parameters(&table, cg)?;
    assert!(store.has_synapse_parameters(&table, cg)?);

    assert_eq!(store.delete_connections(cg)?, 1);
    assert_eq!(store.delete_synapse_parameters(&table, cg)?, 1);
    store.delete_connection_group(cg)?;
    assert!(store.connection_group(cg)?.is_none());
    assert!(store.connection_groups()?.is_empty());

    assert_eq!(store.delete_neurons(g.id)?, 2);
    store.delete_neuron_group(g.id)?;
    assert!(store.neuron_group(g.id)?.is_none());
    Ok(())
}

#[test]
fn memory_store_lattice_and_queries() -> Result<(), Box<dyn Error>> {
    check_lattice_and_queries(&mut MemoryStore::new())
}

#[test]
fn sqlite_store_lattice_and_queries() -> Result<(), Box<dyn Error>> {
    check_lattice_and_queries(&mut SqliteStore::in_memory()?)
}

#[test]
fn memory_store_connection_lifecycle() -> Result<(), Box<dyn Error>> {
    check_connection_lifecycle(&mut MemoryStore::new())
}

#[test]
fn sqlite_store_connection_lifecycle() -> Result<(), Box<dyn Error>> {
    check_connection_lifecycle(&mut SqliteStore::in_memory()?)
}

#[test]
fn sqlite_store_persists_to_file() -> Result<(), Box<dyn Error>> {
    let tmp = tempdir()?;
    let path = tmp.path().join("network.db");
    let id = {
        let mut store = SqliteStore::open(&path)?;
        store.insert_lattice_group(&lattice(0, 3, 2))?.id
    };

    let store = SqliteStore::open(&path)?;
    let group = store.neuron_group(id)?.expect("group persisted");
    assert_eq!((group.width, group.length), (3, 2));
    assert_eq!(store.neuron_count(id)?, 6);
    Ok(())
}
