use std::path::Path;

use indirect_ngin::{
    SceneError,
    data_structures::texture_table::{TextureKey, TextureTable},
};

fn key(k: u64) -> TextureKey {
    TextureKey::new(k).unwrap()
}

#[test]
fn key_zero_is_reserved() {
    assert_eq!(TextureKey::new(0), Err(SceneError::ReservedTextureKey));
    assert_ne!(TextureKey::from_name("").get(), 0);
}

#[test]
fn keys_start_at_their_home_slot() {
    let mut table = TextureTable::new(8);
    let slot = table.insert(key(13), "a").unwrap();
    assert_eq!(slot.index(), 5);
    assert_eq!(table.find(key(13)), Some(slot));
    assert_eq!(table.find(key(5)), None);
}

#[test]
fn collisions_probe_forward_and_wrap() {
    let mut table = TextureTable::new(4);
    assert_eq!(table.insert(key(3), "first").unwrap().index(), 3);
    assert_eq!(table.insert(key(7), "second").unwrap().index(), 0);
    assert_eq!(table.insert(key(11), "third").unwrap().index(), 1);

    assert_eq!(table.find(key(7)).unwrap().index(), 0);
    assert_eq!(table.find(key(11)).unwrap().index(), 1);
    let second = table.get(table.find(key(7)).unwrap()).unwrap();
    assert_eq!(second.texture, "second");
    assert_eq!(second.key(), key(7));
}

#[test]
fn inserting_an_existing_key_returns_its_slot() {
    let mut table = TextureTable::new(4);
    let first = table.insert(key(42), 1).unwrap();
    let mut called = false;
    let again = table
        .insert_with(key(42), || {
            called = true;
            2
        })
        .unwrap();
    assert_eq!(first, again);
    assert!(!called);
    assert_eq!(table.len(), 1);
    assert_eq!(table.get(first).unwrap().texture, 1);
}

#[test]
fn a_full_table_rejects_new_keys_but_finds_old_ones() {
    let mut table = TextureTable::new(2);
    table.insert(key(1), ()).unwrap();
    table.insert(key(2), ()).unwrap();
    assert_eq!(table.free_slots(), 0);
    assert_eq!(
        table.insert(key(3), ()),
        Err(SceneError::TextureTableFull { capacity: 2 })
    );
    assert!(table.insert(key(2), ()).is_ok());
    assert_eq!(table.find(key(3)), None);
}

#[test]
fn zero_capacity_table_is_always_full() {
    let mut table: TextureTable<()> = TextureTable::new(0);
    assert_eq!(
        table.insert(key(1), ()),
        Err(SceneError::TextureTableFull { capacity: 0 })
    );
    assert_eq!(table.find(key(1)), None);
}

#[test]
fn resolving_is_idempotent() {
    let mut table = TextureTable::new(4);
    let slot = table.insert(key(6), "t").unwrap();
    assert_eq!(table.get(slot).unwrap().handle(), None);

    let handle = table.resolve(slot).unwrap();
    assert_eq!(handle, slot.index() as u32);
    assert_eq!(table.resolve(slot), Some(handle));
    assert_eq!(table.get(slot).unwrap().handle(), Some(handle));
}

#[test]
fn equal_paths_share_a_key() {
    let a = TextureKey::from_path(Path::new("assets/floor.png"));
    let b = TextureKey::from_path(&Path::new("assets").join("floor.png"));
    assert_eq!(a, b);
    assert_ne!(a, TextureKey::from_path(Path::new("assets/wall.png")));
}

#[test]
fn ninth_key_does_not_fit_into_eight_slots() {
    let mut table = TextureTable::new(8);
    let keys: Vec<_> = (0..9).map(|i| TextureKey::from_name(&format!("texture{i}"))).collect();
    let slots: Vec<_> = keys[..8]
        .iter()
        .map(|&k| table.insert(k, k.get()).unwrap())
        .collect();
    assert_eq!(
        table.insert(keys[8], keys[8].get()),
        Err(SceneError::TextureTableFull { capacity: 8 })
    );
    assert_eq!(table.find(keys[8]), None);
    for (k, slot) in keys[..8].iter().zip(slots) {
        assert_eq!(table.find(*k), Some(slot));
        assert_eq!(table.get(slot).unwrap().texture, k.get());
    }
}
