use crate::mapping::direct_mapping::DirectMapping;
use crate::mapping::sorted_keyed_mapping::SortedKeyedMapping;
use crate::mapping::NodeMapping;
use crate::utils::bitarray::BitArray;
use crate::utils::bitset::Bitset64;

/// Maps a key byte to a child slot through a 256-entry index table: the table
/// holds the slot position for each present key byte, the slots themselves are
/// filled in arrival order. Enumeration walks the index table, so it comes out
/// in key-byte order regardless of slot order.
pub struct IndexedMapping<N, const WIDTH: usize> {
    child_index: Box<BitArray<u8, 256, Bitset64<4>>>,
    children: Box<BitArray<N, WIDTH, Bitset64<1>>>,
    num_children: u8,
}

impl<N, const WIDTH: usize> Default for IndexedMapping<N, WIDTH> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N, const WIDTH: usize> IndexedMapping<N, WIDTH> {
    pub fn new() -> Self {
        Self {
            child_index: Box::new(BitArray::new()),
            children: Box::new(BitArray::new()),
            num_children: 0,
        }
    }

    /// Drain a sorted mapping (16-wide) into an indexed one (growth path).
    pub fn from_sorted<const KM_WIDTH: usize>(km: &mut SortedKeyedMapping<N, KM_WIDTH>) -> Self {
        let mut im = IndexedMapping::new();
        for i in 0..km.num_children as usize {
            let stolen = std::mem::replace(&mut km.children[i], std::mem::MaybeUninit::uninit());
            im.add_child(km.keys[i], unsafe { stolen.assume_init() });
        }
        km.num_children = 0;
        im
    }

    /// Drain a direct mapping into an indexed one (shrink path).
    pub fn from_direct(dm: &mut DirectMapping<N>) -> Self {
        debug_assert!(dm.num_children() <= WIDTH);
        let mut im = IndexedMapping::new();
        for key in 0..=255u8 {
            if let Some(child) = dm.delete_child(key) {
                im.add_child(key, child);
            }
        }
        im
    }

    /// Smallest (key, child) with key strictly greater than `after`.
    pub(crate) fn seek_next(&self, after: Option<u8>) -> Option<(u8, &N)> {
        let from = match after {
            None => 0,
            Some(255) => return None,
            Some(b) => b as usize + 1,
        };
        let key = self.child_index.next_used(from)?;
        let pos = *self.child_index.get(key)?;
        Some((key as u8, self.children.get(pos as usize)?))
    }

    /// Largest (key, child) with key strictly smaller than `before`.
    pub(crate) fn seek_prev(&self, before: Option<u8>) -> Option<(u8, &N)> {
        let upto = match before {
            None => 255,
            Some(0) => return None,
            Some(b) => b as usize - 1,
        };
        let key = self.child_index.prev_used(upto)?;
        let pos = *self.child_index.get(key)?;
        Some((key as u8, self.children.get(pos as usize)?))
    }

    pub(crate) fn first_child(&self) -> Option<&N> {
        self.seek_next(None).map(|(_, child)| child)
    }

    pub(crate) fn last_child(&self) -> Option<&N> {
        self.seek_prev(None).map(|(_, child)| child)
    }

    #[allow(dead_code)]
    pub(crate) fn iter(&self) -> impl Iterator<Item = (u8, &N)> {
        self.child_index
            .iter()
            .filter_map(move |(key, pos)| Some((key as u8, self.children.get(*pos as usize)?)))
    }
}

impl<N, const WIDTH: usize> NodeMapping<N, WIDTH> for IndexedMapping<N, WIDTH> {
    fn add_child(&mut self, key: u8, node: N) {
        debug_assert!((self.num_children as usize) < WIDTH);
        let Some(pos) = self.children.first_free_pos() else {
            return;
        };
        self.child_index.set(key as usize, pos as u8);
        self.children.set(pos, node);
        self.num_children += 1;
    }

    fn seek_child(&self, key: u8) -> Option<&N> {
        let pos = *self.child_index.get(key as usize)?;
        self.children.get(pos as usize)
    }

    fn seek_child_mut(&mut self, key: u8) -> Option<&mut N> {
        let pos = *self.child_index.get(key as usize)?;
        self.children.get_mut(pos as usize)
    }

    fn delete_child(&mut self, key: u8) -> Option<N> {
        let pos = self.child_index.erase(key as usize)?;
        let old = self.children.erase(pos as usize);
        if old.is_some() {
            self.num_children -= 1;
        }
        old
    }

    fn num_children(&self) -> usize {
        self.num_children as usize
    }
}
