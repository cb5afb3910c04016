//! Recency List Module
//!
//! Implements the ordering structure behind the LRU wrapper.

// == Node Id ==
/// Stable handle to a node of a [`RecencyList`].
///
/// Handed out by [`RecencyList::push_front`] and kept next to the cached value
/// so the node can be moved or unlinked without searching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug)]
struct Node<K> {
    key: K,
    prev: Option<usize>,
    next: Option<usize>,
}

// == Recency List ==
/// Doubly linked list of keys ordered by access time.
///
/// Nodes live in a slot vector and link to each other by index:
/// - Front = Most recently used
/// - Back = Least recently used
///
/// Push, move-to-front, unlink and eviction are all O(1).
#[derive(Debug)]
pub struct RecencyList<K> {
    slots: Vec<Option<Node<K>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<K> Default for RecencyList<K> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }
}

impl<K> RecencyList<K> {
    // == Constructor ==
    /// Creates a new empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty list with room for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    // == Push Front ==
    /// Inserts a key as the most recently used and returns its handle.
    pub fn push_front(&mut self, key: K) -> NodeId {
        let node = Node {
            key,
            prev: None,
            next: None,
        };
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(node);
                index
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };
        self.len += 1;
        self.attach_front(index);
        NodeId(index)
    }

    // == Touch ==
    /// Marks a node as most recently used.
    ///
    /// Returns false if the handle is not part of the list.
    pub fn move_to_front(&mut self, id: NodeId) -> bool {
        if !self.contains(id) {
            return false;
        }
        if self.head != Some(id.0) {
            self.detach(id.0);
            self.attach_front(id.0);
        }
        true
    }

    // == Remove ==
    /// Unlinks a node and returns its key.
    pub fn remove(&mut self, id: NodeId) -> Option<K> {
        if !self.contains(id) {
            return None;
        }
        self.detach(id.0);
        let node = self.slots[id.0].take()?;
        self.free.push(id.0);
        self.len -= 1;
        Some(node.key)
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    ///
    /// Returns None if the list is empty.
    #[cfg(test)]
    pub(crate) fn evict_oldest(&mut self) -> Option<K> {
        let tail = self.tail?;
        self.remove(NodeId(tail))
    }

    // == Peek ==
    /// Returns the least recently used key without removing it.
    pub fn peek_oldest(&self) -> Option<&K> {
        self.tail.and_then(|index| self.key_at(index))
    }

    /// Returns the most recently used key.
    pub fn peek_newest(&self) -> Option<&K> {
        self.head.and_then(|index| self.key_at(index))
    }

    /// Returns the handle of the least recently used node.
    pub fn oldest_id(&self) -> Option<NodeId> {
        self.tail.map(NodeId)
    }

    pub fn get(&self, id: NodeId) -> Option<&K> {
        self.key_at(id.0)
    }

    fn contains(&self, id: NodeId) -> bool {
        matches!(self.slots.get(id.0), Some(Some(_)))
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drops every node.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    /// Iterates keys from most to least recently used.
    pub fn iter(&self) -> Iter<'_, K> {
        Iter {
            list: self,
            current: self.head,
        }
    }

    // == Linking ==
    fn key_at(&self, index: usize) -> Option<&K> {
        self.slots
            .get(index)
            .and_then(|slot| slot.as_ref())
            .map(|node| &node.key)
    }

    fn node_mut(&mut self, index: usize) -> &mut Node<K> {
        self.slots[index]
            .as_mut()
            .expect("linked index must point at a live node")
    }

    fn detach(&mut self, index: usize) {
        let (prev, next) = {
            let node = self.node_mut(index);
            let links = (node.prev, node.next);
            node.prev = None;
            node.next = None;
            links
        };

        match prev {
            Some(prev) => self.node_mut(prev).next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.node_mut(next).prev = prev,
            None => self.tail = prev,
        }
    }

    fn attach_front(&mut self, index: usize) {
        let old_head = self.head;
        {
            let node = self.node_mut(index);
            node.prev = None;
            node.next = old_head;
        }
        match old_head {
            Some(head) => self.node_mut(head).prev = Some(index),
            None => self.tail = Some(index),
        }
        self.head = Some(index);
    }
}

// == Iterator ==
/// Iterator over keys from most to least recently used.
pub struct Iter<'a, K> {
    list: &'a RecencyList<K>,
    current: Option<usize>,
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.current?;
        let node = self.list.slots.get(index)?.as_ref()?;
        self.current = node.next;
        Some(&node.key)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn keys(list: &RecencyList<&'static str>) -> Vec<&'static str> {
        list.iter().copied().collect()
    }

    #[test]
    fn test_list_new() {
        let list: RecencyList<&str> = RecencyList::new();
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
        assert!(list.peek_oldest().is_none());
        assert!(list.peek_newest().is_none());
    }

    #[test]
    fn test_push_front_orders_newest_first() {
        let mut list = RecencyList::new();

        list.push_front("key1");
        list.push_front("key2");
        list.push_front("key3");

        assert_eq!(list.len(), 3);
        assert_eq!(list.peek_oldest(), Some(&"key1"));
        assert_eq!(list.peek_newest(), Some(&"key3"));
        assert_eq!(keys(&list), vec!["key3", "key2", "key1"]);
    }

    #[test]
    fn test_move_to_front() {
        let mut list = RecencyList::new();

        let a = list.push_front("a");
        list.push_front("b");
        list.push_front("c");

        assert!(list.move_to_front(a));
        assert_eq!(list.peek_newest(), Some(&"a"));
        assert_eq!(list.peek_oldest(), Some(&"b"));
        assert_eq!(keys(&list), vec!["a", "c", "b"]);

        // Moving the head is a no-op
        assert!(list.move_to_front(a));
        assert_eq!(keys(&list), vec!["a", "c", "b"]);
    }

    #[test]
    fn test_evict_oldest() {
        let mut list = RecencyList::new();

        list.push_front("key1");
        list.push_front("key2");
        list.push_front("key3");

        assert_eq!(list.evict_oldest(), Some("key1"));
        assert_eq!(list.len(), 2);
        assert_eq!(list.evict_oldest(), Some("key2"));
        assert_eq!(list.evict_oldest(), Some("key3"));
        assert_eq!(list.evict_oldest(), None);
        assert!(list.is_empty());
    }

    #[test]
    fn test_remove_middle_node() {
        let mut list = RecencyList::new();

        list.push_front("key1");
        let key2 = list.push_front("key2");
        list.push_front("key3");

        assert_eq!(list.remove(key2), Some("key2"));
        assert_eq!(list.len(), 2);
        assert!(!list.contains(key2));
        assert_eq!(keys(&list), vec!["key3", "key1"]);

        // Second removal of the same handle does nothing
        assert_eq!(list.remove(key2), None);
        assert!(!list.move_to_front(key2));
    }

    #[test]
    fn test_freed_slots_are_reused() {
        let mut list = RecencyList::new();

        let a = list.push_front("a");
        list.push_front("b");
        list.remove(a);
        let c = list.push_front("c");

        assert_eq!(c, a);
        assert_eq!(list.get(c), Some(&"c"));
        assert_eq!(keys(&list), vec!["c", "b"]);
        assert_eq!(list.oldest_id().and_then(|id| list.get(id)), Some(&"b"));
    }

    #[test]
    fn test_order_after_multiple_touches() {
        let mut list = RecencyList::new();

        let a = list.push_front("a");
        let b = list.push_front("b");
        let c = list.push_front("c");

        list.move_to_front(a);
        list.move_to_front(c);
        list.move_to_front(b);

        // front=[b, c, a]=back
        assert_eq!(list.evict_oldest(), Some("a"));
        assert_eq!(list.evict_oldest(), Some("c"));
        assert_eq!(list.evict_oldest(), Some("b"));
    }

    #[test]
    fn test_clear() {
        let mut list = RecencyList::with_capacity(4);
        let a = list.push_front("a");
        list.push_front("b");

        list.clear();
        assert!(list.is_empty());
        assert!(!list.contains(a));
        assert_eq!(list.iter().count(), 0);

        list.push_front("c");
        assert_eq!(keys(&list), vec!["c"]);
    }
}
