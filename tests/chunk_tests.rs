//! Chunk Graph & Collection Tests
//!
//! Tests for:
//! - Cycle rejection in add_child / set_proxy (graph untouched on failure)
//! - Active list ordering: children before parents, proxies resolved, dedup
//! - Collection hash: stability, value-only changes, lazy recomputation
//! - Subscription bookkeeping across structural edits
//! - Code generation order and setup flag handling

mod common;

use common::{MockBackend, Snippet, Value};
use myth_chunks::chunks::{ChunkGraph, GroupChunk, ShaderEnum, ShaderFlag};
use myth_chunks::errors::ChunkError;
use myth_chunks::program::GpuBackend;

// ============================================================================
// Cycle safety
// ============================================================================

#[test]
fn add_child_rejects_indirect_cycle() {
    let mut graph = ChunkGraph::new();
    let a = graph.insert(GroupChunk);
    let b = graph.insert(GroupChunk);
    let c = graph.insert(GroupChunk);
    graph.add_child(a, b).unwrap();
    graph.add_child(b, c).unwrap();

    let err = graph.add_child(c, a).unwrap_err();
    assert!(matches!(err, ChunkError::CyclicDependency { operation: "add_child" }));
    assert!(graph.children(c).is_empty());
    assert_eq!(graph.children(a), [b.id()]);
}

#[test]
fn add_child_rejects_cycle_through_proxy() {
    let mut graph = ChunkGraph::new();
    let a = graph.insert(GroupChunk);
    let b = graph.insert(GroupChunk);
    let proxy = graph.create_proxy(a).unwrap();
    graph.add_child(a, b).unwrap();

    // b -> proxy -> a -> b
    assert!(graph.add_child(b, proxy).is_err());
    assert!(graph.children(b).is_empty());
}

#[test]
fn add_child_rejects_duplicate() {
    let mut graph = ChunkGraph::new();
    let a = graph.insert(GroupChunk);
    let b = graph.insert(GroupChunk);
    graph.add_child(a, b).unwrap();

    let err = graph.add_child(a, b).unwrap_err();
    assert!(matches!(err, ChunkError::DuplicateChild { .. }));
    assert_eq!(graph.children(a).len(), 1);
}

#[test]
fn set_proxy_rejects_cycle_and_keeps_old_target() {
    let mut graph = ChunkGraph::new();
    let a = graph.insert(GroupChunk);
    let b = graph.insert(GroupChunk);
    let c = graph.insert(GroupChunk);
    graph.set_proxy(a, Some(b.id())).unwrap();
    graph.add_child(b, c).unwrap();

    let err = graph.set_proxy(c, Some(a.id())).unwrap_err();
    assert!(matches!(err, ChunkError::CyclicDependency { operation: "set_proxy" }));
    assert_eq!(graph.proxy(c), None);

    // Self proxy is a cycle too.
    assert!(graph.set_proxy(b, Some(b.id())).is_err());
    assert_eq!(graph.proxy(a), Some(b.id()));
}

#[test]
fn proxied_chunk_children_still_guard_cycles() {
    let mut graph = ChunkGraph::new();
    let a = graph.insert(GroupChunk);
    let t = graph.insert(Snippet::new("pf", "T"));
    let c = graph.insert(Snippet::new("pf", "C"));
    graph.set_proxy(a, Some(t.id())).unwrap();
    graph.add_child(a, c).unwrap();

    let err = graph.add_child(c, a).unwrap_err();
    assert!(matches!(err, ChunkError::CyclicDependency { operation: "add_child" }));
    assert!(graph.children(c).is_empty());
    assert!(graph.set_proxy(c, Some(a.id())).is_err());

    // Clearing the proxy revives the dormant child without looping.
    let collection = graph.create_collection();
    graph.collection_add(collection, a).unwrap();
    assert_eq!(graph.collection_hash(collection).unwrap(), "T");
    graph.set_proxy(a, None).unwrap();
    assert_eq!(graph.collection_hash(collection).unwrap(), "C");
}

#[test]
fn stale_ids_are_reported() {
    let mut graph = ChunkGraph::new();
    let a = graph.insert(GroupChunk);
    let b = graph.insert(GroupChunk);
    graph.remove(b);
    assert!(matches!(graph.add_child(a, b), Err(ChunkError::ChunkNotFound(_))));

    let collection = graph.create_collection();
    graph.remove_collection(collection);
    assert!(matches!(
        graph.collection_hash(collection),
        Err(ChunkError::CollectionNotFound(_))
    ));
}

// ============================================================================
// Active list
// ============================================================================

#[test]
fn actives_emit_children_before_parents() {
    let mut graph = ChunkGraph::new();
    let root = graph.insert(Snippet::new("x", "root"));
    let a = graph.insert(Snippet::new("x", "a"));
    let b = graph.insert(Snippet::new("x", "b"));
    graph.add_child(root, a).unwrap();
    graph.add_child(root, b).unwrap();

    let collection = graph.create_collection();
    graph.collection_add(collection, root).unwrap();

    assert_eq!(graph.collection_actives(collection).unwrap(), [a.id(), b.id(), root.id()]);
    assert_eq!(graph.collection_hash(collection).unwrap(), "a|b|root");
}

#[test]
fn shared_chunk_is_emitted_once_at_first_position() {
    let mut graph = ChunkGraph::new();
    let shared = graph.insert(Snippet::new("x", "s"));
    let p1 = graph.insert(GroupChunk);
    let p2 = graph.insert(GroupChunk);
    graph.add_child(p1, shared).unwrap();
    graph.add_child(p2, shared).unwrap();

    let collection = graph.create_collection();
    graph.collection_add(collection, p1).unwrap();
    graph.collection_add(collection, p2).unwrap();

    assert_eq!(graph.collection_actives(collection).unwrap(), [shared.id(), p1.id(), p2.id()]);
}

#[test]
fn proxy_contributes_its_target() {
    let mut graph = ChunkGraph::new();
    let target = graph.insert(Snippet::new("pf", "T"));
    let proxy = graph.create_proxy(target).unwrap();

    let collection = graph.create_collection();
    graph.collection_add(collection, proxy).unwrap();
    let slots = graph.collection_gen_code(collection).unwrap();

    assert_eq!(slots.get("pf"), Some("T"));
    assert_eq!(graph.collection(collection).unwrap().all(), [proxy.id(), target.id()]);
    assert_eq!(graph.resolve(proxy).unwrap(), target.id());
}

#[test]
fn retargeting_proxy_changes_hash() {
    let mut graph = ChunkGraph::new();
    let t1 = graph.insert(Snippet::new("pf", "one"));
    let t2 = graph.insert(Snippet::new("pf", "two"));
    let proxy = graph.create_proxy(t1).unwrap();

    let collection = graph.create_collection();
    graph.collection_add(collection, proxy).unwrap();
    assert_eq!(graph.collection_hash(collection).unwrap(), "one");

    graph.set_proxy(proxy, Some(t2.id())).unwrap();
    assert_eq!(graph.collection_hash(collection).unwrap(), "two");
    // t1 is no longer reachable.
    assert!(graph.subscribers(t1).is_empty());
    assert_eq!(graph.subscribers(t2), [collection]);
}

// ============================================================================
// Hash & invalidation
// ============================================================================

#[test]
fn hash_is_stable_without_changes() {
    let mut graph = ChunkGraph::new();
    let flag = graph.insert(ShaderFlag::new("useFog", true));
    let collection = graph.create_collection();
    graph.collection_add(collection, flag).unwrap();

    let first = graph.collection_hash(collection).unwrap().to_owned();
    assert!(!graph.refresh_collection(collection).unwrap());
    assert_eq!(graph.collection_hash(collection).unwrap(), first);
}

#[test]
fn value_only_change_keeps_hash() {
    let mut graph = ChunkGraph::new();
    let root = graph.insert(GroupChunk);
    let code = graph.insert(Snippet::new("pf", "c"));
    let value = graph.insert(Value { name: "uA", value: 1.0 });
    graph.add_child(root, code).unwrap();
    graph.add_child(root, value).unwrap();

    let collection = graph.create_collection();
    graph.collection_add(collection, root).unwrap();
    let before = graph.collection_hash(collection).unwrap().to_owned();

    graph.get_mut(value).unwrap().value = 2.0;
    graph.mark_invalid(value);

    assert_eq!(graph.collection_hash(collection).unwrap(), before);
    assert!(graph.collection_is_invalid(collection).unwrap());
}

#[test]
fn code_change_needs_invalidation() {
    let mut graph = ChunkGraph::new();
    let e = graph.insert(ShaderEnum::new("mode", &["A", "B"]).unwrap());
    let collection = graph.create_collection();
    graph.collection_add(collection, e).unwrap();
    assert_eq!(graph.collection_hash(collection).unwrap(), "mode=A");

    graph.get_mut(e).unwrap().set("B").unwrap();
    // Pull-based: nothing recomputes until told.
    assert_eq!(graph.collection_hash(collection).unwrap(), "mode=A");

    graph.invalidate_code(e);
    assert!(graph.collection(collection).unwrap().is_code_dirty());
    assert!(!graph.collection(collection).unwrap().is_list_dirty());
    assert_eq!(graph.collection_hash(collection).unwrap(), "mode=B");
}

#[test]
fn structural_edit_sets_both_dirty_bits() {
    let mut graph = ChunkGraph::new();
    let root = graph.insert(GroupChunk);
    let collection = graph.create_collection();
    graph.collection_add(collection, root).unwrap();
    graph.refresh_collection(collection).unwrap();

    let child = graph.insert(Snippet::new("pf", "x"));
    graph.add_child(root, child).unwrap();
    let c = graph.collection(collection).unwrap();
    assert!(c.is_list_dirty() && c.is_code_dirty());
    assert_eq!(graph.collection_hash(collection).unwrap(), "x");
}

#[test]
fn remove_child_unsubscribes_after_refresh() {
    let mut graph = ChunkGraph::new();
    let root = graph.insert(GroupChunk);
    let child = graph.insert(Snippet::new("pf", "x"));
    graph.add_child(root, child).unwrap();

    let collection = graph.create_collection();
    graph.collection_add(collection, root).unwrap();
    graph.refresh_collection(collection).unwrap();
    assert_eq!(graph.subscribers(child), [collection]);

    assert!(graph.remove_child(root, child).unwrap());
    assert!(!graph.remove_child(root, child).unwrap());
    assert_eq!(graph.collection_hash(collection).unwrap(), "");
    assert!(graph.subscribers(child).is_empty());
}

#[test]
fn removing_chunk_updates_collections() {
    let mut graph = ChunkGraph::new();
    let a = graph.insert(Snippet::new("pf", "a"));
    let b = graph.insert(Snippet::new("pf", "b"));
    let collection = graph.create_collection();
    graph.collection_add(collection, a).unwrap();
    graph.collection_add(collection, b).unwrap();
    assert_eq!(graph.collection_hash(collection).unwrap(), "a|b");

    graph.remove(a);
    assert_eq!(graph.collection(collection).unwrap().roots(), [b.id()]);
    assert_eq!(graph.collection_hash(collection).unwrap(), "b");
}

// ============================================================================
// Code generation & setup
// ============================================================================

#[test]
fn gen_code_follows_active_order() {
    let mut graph = ChunkGraph::new();
    let root = graph.insert(Snippet::new("pf", "C"));
    let a = graph.insert(Snippet::new("pf", "A"));
    let b = graph.insert(Snippet::new("pf", "B"));
    graph.add_child(root, a).unwrap();
    graph.add_child(root, b).unwrap();

    let collection = graph.create_collection();
    graph.collection_add(collection, root).unwrap();
    let slots = graph.collection_gen_code(collection).unwrap();

    assert_eq!(slots.get("pf"), Some("ABC"));
    assert_eq!(slots.hash(), "A|B|C");
    assert_eq!(slots.fragment_count(), 3);
}

#[test]
fn setup_clears_pending_flag() {
    let backend = MockBackend::new();
    let program = backend.create_program("t", "v", "f").unwrap();

    let mut graph = ChunkGraph::new();
    let value = graph.insert(Value { name: "uA", value: 3.0 });
    let collection = graph.create_collection();
    graph.collection_add(collection, value).unwrap();

    assert!(graph.is_invalid(value).unwrap());
    graph.collection_setup(collection, &program).unwrap();
    assert!(!graph.is_invalid(value).unwrap());
    assert_eq!(program.floats("uA"), Some(vec![3.0]));
}
