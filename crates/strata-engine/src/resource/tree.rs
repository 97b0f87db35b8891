use std::fmt;

/// Teardown hook run exactly once when its node is released.
pub type Hook<D> = Box<dyn FnOnce(&mut D) + Send>;

/// Handle to a node of a [`ResourceTree`].
///
/// Handles are generational: once a node is released its handle stays dead
/// even if the slot is later reused.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    index: u32,
    generation: u32,
}

struct Node<D: ?Sized> {
    label: &'static str,
    owner: Option<u32>,
    /// Children in injection order; released back to front.
    owned: Vec<u32>,
    hook: Option<Hook<D>>,
}

struct Slot<D: ?Sized> {
    generation: u32,
    node: Option<Node<D>>,
}

/// Single-owner tree of releasable resources.
///
/// `D` is the device handed to teardown hooks (a GPU backend in production,
/// anything recording calls in tests).
pub struct ResourceTree<D: ?Sized> {
    slots: Vec<Slot<D>>,
    free: Vec<u32>,
    live: usize,
}

impl<D: ?Sized> Default for ResourceTree<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: ?Sized> ResourceTree<D> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Registers a new, unowned live resource.
    pub fn create(&mut self, label: &'static str, hook: Option<Hook<D>>) -> ResourceId {
        let node = Node {
            label,
            owner: None,
            owned: Vec::new(),
            hook,
        };
        self.live += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return ResourceId {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        ResourceId {
            index,
            generation: 0,
        }
    }

    /// Registers a new resource directly under `owner`.
    pub fn create_owned(
        &mut self,
        owner: ResourceId,
        label: &'static str,
        hook: Option<Hook<D>>,
    ) -> ResourceId {
        let id = self.create(label, hook);
        self.inject(owner, id)
    }

    /// Makes `owner` the sole owner of `child` and returns `child`.
    ///
    /// Panics if either side is released or `child` already has an owner.
    pub fn inject(&mut self, owner: ResourceId, child: ResourceId) -> ResourceId {
        assert!(self.is_live(owner), "inject: owner {owner:?} is released");
        assert!(self.is_live(child), "inject: child {child:?} is released");
        assert_ne!(owner, child, "inject: resource cannot own itself");
        debug_assert!(
            !self.is_ancestor(child, owner),
            "inject: `{}` would own one of its ancestors",
            self.node(owner).label
        );

        let child_node = self.node_mut(child);
        assert!(
            child_node.owner.is_none(),
            "inject: `{}` is already owned by another resource",
            child_node.label
        );
        child_node.owner = Some(owner.index);
        self.node_mut(owner).owned.push(child.index);
        child
    }

    /// Detaches `child` from `owner`, releasing it when `dispose_now` is set.
    ///
    /// Rejecting an already released child is a no-op. Rejecting a live
    /// resource that `owner` does not own is a contract violation and panics.
    pub fn reject(&mut self, owner: ResourceId, child: ResourceId, dispose_now: bool, device: &mut D) {
        if !self.is_live(child) {
            return;
        }
        assert!(self.is_live(owner), "reject: owner {owner:?} is released");

        // The most recent child sits at the back: detaching it is O(1).
        let owned = &self.node(owner).owned;
        let pos = match owned.last() {
            Some(&last) if last == child.index => Some(owned.len() - 1),
            _ => owned.iter().rposition(|&i| i == child.index),
        };
        let Some(pos) = pos else {
            panic!(
                "reject: `{}` is not owned by `{}`",
                self.node(child).label,
                self.node(owner).label
            );
        };
        self.node_mut(owner).owned.remove(pos);
        self.node_mut(child).owner = None;

        if dispose_now {
            self.release(child, device);
        }
    }

    /// Releases `id` and everything it owns. Idempotent.
    pub fn release(&mut self, id: ResourceId, device: &mut D) {
        if !self.is_live(id) {
            return;
        }

        if let Some(owner) = self.node(id).owner {
            if let Some(node) = self.slots[owner as usize].node.as_mut() {
                if let Some(pos) = node.owned.iter().rposition(|&i| i == id.index) {
                    node.owned.remove(pos);
                }
            }
        }

        self.release_subtree(id.index, device);
    }

    /// Releases every live resource that has no owner. Returns how many
    /// top-level resources were released.
    pub fn release_all(&mut self, device: &mut D) -> usize {
        let roots = self.roots();
        for &root in &roots {
            self.release(root, device);
        }
        roots.len()
    }

    #[inline]
    pub fn is_live(&self, id: ResourceId) -> bool {
        self.slots
            .get(id.index as usize)
            .is_some_and(|s| s.generation == id.generation && s.node.is_some())
    }

    /// Number of live resources in the tree.
    #[inline]
    pub fn live_count(&self) -> usize {
        self.live
    }

    pub fn label(&self, id: ResourceId) -> Option<&'static str> {
        self.get(id).map(|n| n.label)
    }

    pub fn owner(&self, id: ResourceId) -> Option<ResourceId> {
        let owner = self.get(id)?.owner?;
        Some(self.id_at(owner))
    }

    /// Direct children of `id`, in injection order.
    pub fn owned(&self, id: ResourceId) -> Vec<ResourceId> {
        self.get(id)
            .map(|n| n.owned.iter().map(|&i| self.id_at(i)).collect())
            .unwrap_or_default()
    }

    /// Live resources without an owner.
    pub fn roots(&self) -> Vec<ResourceId> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| match &s.node {
                Some(n) if n.owner.is_none() => Some(ResourceId {
                    index: i as u32,
                    generation: s.generation,
                }),
                _ => None,
            })
            .collect()
    }

    fn release_subtree(&mut self, index: u32, device: &mut D) {
        let (owned, hook) = match self.slots[index as usize].node.as_mut() {
            Some(node) => (std::mem::take(&mut node.owned), node.hook.take()),
            None => return,
        };

        for child in owned.into_iter().rev() {
            self.release_subtree(child, device);
        }

        if let Some(hook) = hook {
            hook(device);
        }

        let slot = &mut self.slots[index as usize];
        slot.node = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
        self.live -= 1;
    }

    fn is_ancestor(&self, candidate: ResourceId, of: ResourceId) -> bool {
        let mut cursor = self.get(of).and_then(|n| n.owner);
        while let Some(i) = cursor {
            if i == candidate.index {
                return true;
            }
            cursor = self.slots[i as usize].node.as_ref().and_then(|n| n.owner);
        }
        false
    }

    fn id_at(&self, index: u32) -> ResourceId {
        ResourceId {
            index,
            generation: self.slots[index as usize].generation,
        }
    }

    fn get(&self, id: ResourceId) -> Option<&Node<D>> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    fn node(&self, id: ResourceId) -> &Node<D> {
        match self.get(id) {
            Some(n) => n,
            None => panic!("resource {id:?} is released"),
        }
    }

    fn node_mut(&mut self, id: ResourceId) -> &mut Node<D> {
        let slot = &mut self.slots[id.index as usize];
        match slot.node.as_mut() {
            Some(n) if slot.generation == id.generation => n,
            _ => panic!("resource {id:?} is released"),
        }
    }
}

impl<D: ?Sized> fmt::Debug for ResourceTree<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceTree")
            .field("live", &self.live)
            .field("slots", &self.slots.len())
            .finish()
    }
}

impl<D: ?Sized> Drop for ResourceTree<D> {
    fn drop(&mut self) {
        if self.live > 0 {
            log::warn!(
                "resource tree dropped with {} live resources; their teardown hooks never ran",
                self.live
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Log = Vec<&'static str>;

    fn logged(name: &'static str) -> Option<Hook<Log>> {
        Some(Box::new(move |log: &mut Log| log.push(name)))
    }

    fn node(tree: &mut ResourceTree<Log>, name: &'static str) -> ResourceId {
        tree.create(name, logged(name))
    }

    // ── release ordering ──────────────────────────────────────────────────

    #[test]
    fn release_is_depth_first_most_recent_first() {
        let mut tree = ResourceTree::new();
        let root = node(&mut tree, "root");
        let a = node(&mut tree, "a");
        let a1 = node(&mut tree, "a1");
        let a2 = node(&mut tree, "a2");
        let b = node(&mut tree, "b");
        tree.inject(root, a);
        tree.inject(a, a1);
        tree.inject(a, a2);
        tree.inject(root, b);

        let mut log = Log::new();
        tree.release(root, &mut log);

        assert_eq!(log, ["b", "a2", "a1", "a", "root"]);
        assert_eq!(tree.live_count(), 0);
    }

    #[test]
    fn descendants_tear_down_before_their_owner() {
        let mut tree = ResourceTree::new();
        let root = node(&mut tree, "root");
        let mid = tree.create_owned(root, "mid", logged("mid"));
        tree.create_owned(mid, "leaf", logged("leaf"));

        let mut log = Log::new();
        tree.release(root, &mut log);

        let pos = |n| log.iter().position(|&x| x == n).unwrap();
        assert!(pos("leaf") < pos("mid"));
        assert!(pos("mid") < pos("root"));
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn release_twice_is_a_no_op() {
        let mut tree = ResourceTree::new();
        let root = node(&mut tree, "root");
        tree.create_owned(root, "child", logged("child"));

        let mut log = Log::new();
        tree.release(root, &mut log);
        tree.release(root, &mut log);

        assert_eq!(log, ["child", "root"]);
        assert!(!tree.is_live(root));
    }

    #[test]
    fn releasing_a_child_first_unlinks_it_from_its_owner() {
        let mut tree = ResourceTree::new();
        let root = node(&mut tree, "root");
        let child = tree.create_owned(root, "child", logged("child"));

        let mut log = Log::new();
        tree.release(child, &mut log);
        assert!(tree.owned(root).is_empty());

        tree.release(root, &mut log);
        assert_eq!(log, ["child", "root"]);
    }

    #[test]
    fn resources_without_hooks_still_release() {
        let mut tree: ResourceTree<Log> = ResourceTree::new();
        let root = tree.create("group", None);
        let child = tree.create_owned(root, "child", logged("child"));

        let mut log = Log::new();
        tree.release(root, &mut log);
        assert_eq!(log, ["child"]);
        assert!(!tree.is_live(child));
    }

    // ── reject ────────────────────────────────────────────────────────────

    #[test]
    fn reject_first_child_without_dispose_keeps_it_live() {
        let mut tree = ResourceTree::new();
        let root = node(&mut tree, "root");
        let a = tree.create_owned(root, "a", logged("a"));
        let b = tree.create_owned(root, "b", logged("b"));

        let mut log = Log::new();
        tree.reject(root, b, false, &mut log);

        assert!(tree.is_live(b));
        assert_eq!(tree.owner(b), None);
        assert_eq!(tree.owned(root), vec![a]);

        tree.release(root, &mut log);
        assert_eq!(log, ["a", "root"]);
        assert!(tree.is_live(b));
    }

    #[test]
    fn reject_inner_child_with_dispose_releases_it() {
        let mut tree = ResourceTree::new();
        let root = node(&mut tree, "root");
        let a = tree.create_owned(root, "a", logged("a"));
        let b = tree.create_owned(root, "b", logged("b"));
        let c = tree.create_owned(root, "c", logged("c"));

        let mut log = Log::new();
        tree.reject(root, b, true, &mut log);

        assert_eq!(log, ["b"]);
        assert_eq!(tree.owned(root), vec![a, c]);
    }

    #[test]
    fn reject_of_released_child_is_a_no_op() {
        let mut tree = ResourceTree::new();
        let root = node(&mut tree, "root");
        let a = tree.create_owned(root, "a", logged("a"));

        let mut log = Log::new();
        tree.reject(root, a, true, &mut log);
        tree.reject(root, a, true, &mut log);
        assert_eq!(log, ["a"]);
    }

    #[test]
    #[should_panic(expected = "is not owned by")]
    fn reject_of_foreign_resource_panics() {
        let mut tree = ResourceTree::new();
        let root = node(&mut tree, "root");
        let stranger = node(&mut tree, "stranger");
        tree.reject(root, stranger, false, &mut Log::new());
    }

    // ── inject ────────────────────────────────────────────────────────────

    #[test]
    fn inject_returns_the_child() {
        let mut tree = ResourceTree::new();
        let root = node(&mut tree, "root");
        let child = node(&mut tree, "child");
        assert_eq!(tree.inject(root, child), child);
        assert_eq!(tree.owner(child), Some(root));
    }

    #[test]
    #[should_panic(expected = "already owned")]
    fn double_injection_panics() {
        let mut tree = ResourceTree::new();
        let a = node(&mut tree, "a");
        let b = node(&mut tree, "b");
        let child = node(&mut tree, "child");
        tree.inject(a, child);
        tree.inject(b, child);
    }

    #[test]
    fn rejected_child_can_move_to_a_new_owner() {
        let mut tree = ResourceTree::new();
        let a = node(&mut tree, "a");
        let b = node(&mut tree, "b");
        let child = tree.create_owned(a, "child", logged("child"));

        let mut log = Log::new();
        tree.reject(a, child, false, &mut log);
        tree.inject(b, child);

        tree.release(a, &mut log);
        assert_eq!(log, ["a"]);
        tree.release(b, &mut log);
        assert_eq!(log, ["a", "child", "b"]);
    }

    // ── handles ───────────────────────────────────────────────────────────

    #[test]
    fn stale_handle_stays_dead_after_slot_reuse() {
        let mut tree = ResourceTree::new();
        let old = node(&mut tree, "old");
        tree.release(old, &mut Log::new());

        let new = node(&mut tree, "new");
        assert!(tree.is_live(new));
        assert!(!tree.is_live(old));
        assert_eq!(tree.label(old), None);
        assert_eq!(tree.label(new), Some("new"));
    }

    #[test]
    fn release_all_releases_every_root() {
        let mut tree = ResourceTree::new();
        let a = node(&mut tree, "a");
        tree.create_owned(a, "a.child", logged("a.child"));
        node(&mut tree, "b");

        let mut log = Log::new();
        assert_eq!(tree.release_all(&mut log), 2);
        assert_eq!(tree.live_count(), 0);
        assert_eq!(log.len(), 3);
    }
}
