use num_traits::PrimInt;

/// Operations shared by the fixed-width bitsets backing the node mappings.
pub trait BitsetTrait: Default {
    fn set(&mut self, pos: usize);
    fn unset(&mut self, pos: usize);
    fn check(&self, pos: usize) -> bool;
    fn clear(&mut self);
    /// Position of the first zero bit, if any.
    fn first_empty(&self) -> Option<usize>;
    /// Position of the first set bit at or after `from`.
    fn next_set(&self, from: usize) -> Option<usize>;
    /// Position of the last set bit at or before `upto`.
    fn prev_set(&self, upto: usize) -> Option<usize>;
    fn count(&self) -> usize;
    fn is_empty(&self) -> bool;
    fn capacity(&self) -> usize;
}

// TODO: most of these parameters can be derived from one another once
// generic_const_exprs lands in stable.
pub struct Bitset<
    StorageType,
    const BIT_WIDTH: usize,
    const SHIFT: usize,
    const STORAGE_WIDTH: usize,
> where
    StorageType: PrimInt,
{
    bitset: [StorageType; STORAGE_WIDTH],
}

impl<StorageType, const BIT_WIDTH: usize, const SHIFT: usize, const STORAGE_WIDTH: usize>
    Bitset<StorageType, BIT_WIDTH, SHIFT, STORAGE_WIDTH>
where
    StorageType: PrimInt,
{
    pub fn new() -> Self {
        Self {
            bitset: [StorageType::zero(); STORAGE_WIDTH],
        }
    }
}

impl<StorageType, const BIT_WIDTH: usize, const SHIFT: usize, const STORAGE_WIDTH: usize>
    BitsetTrait for Bitset<StorageType, BIT_WIDTH, SHIFT, STORAGE_WIDTH>
where
    StorageType: PrimInt,
{
    #[inline]
    fn set(&mut self, pos: usize) {
        assert!(pos < STORAGE_WIDTH * BIT_WIDTH);
        let shift: StorageType = StorageType::one() << (pos % BIT_WIDTH);
        self.bitset[pos >> SHIFT] = self.bitset[pos >> SHIFT].bitor(shift);
    }

    #[inline]
    fn unset(&mut self, pos: usize) {
        assert!(pos < STORAGE_WIDTH * BIT_WIDTH);
        let shift: StorageType = StorageType::one() << (pos % BIT_WIDTH);
        self.bitset[pos >> SHIFT] = self.bitset[pos >> SHIFT] & shift.not();
    }

    #[inline]
    fn check(&self, pos: usize) -> bool {
        assert!(pos < STORAGE_WIDTH * BIT_WIDTH);
        let shift: StorageType = StorageType::one() << (pos % BIT_WIDTH);
        !(self.bitset[pos >> SHIFT] & shift).is_zero()
    }

    #[inline]
    fn clear(&mut self) {
        for b in &mut self.bitset {
            *b = StorageType::zero();
        }
    }

    fn first_empty(&self) -> Option<usize> {
        for (i, b) in self.bitset.iter().enumerate() {
            if *b != StorageType::max_value() {
                let pos = (i << SHIFT) + b.trailing_ones() as usize;
                if pos < STORAGE_WIDTH * BIT_WIDTH {
                    return Some(pos);
                }
            }
        }
        None
    }

    fn next_set(&self, from: usize) -> Option<usize> {
        if from >= STORAGE_WIDTH * BIT_WIDTH {
            return None;
        }
        let start_word = from >> SHIFT;
        let offset = from % BIT_WIDTH;
        let w = self.bitset[start_word].unsigned_shr(offset as u32);
        if !w.is_zero() {
            return Some(from + w.trailing_zeros() as usize);
        }
        for i in start_word + 1..STORAGE_WIDTH {
            let b = self.bitset[i];
            if !b.is_zero() {
                return Some((i << SHIFT) + b.trailing_zeros() as usize);
            }
        }
        None
    }

    fn prev_set(&self, upto: usize) -> Option<usize> {
        let upto = upto.min(STORAGE_WIDTH * BIT_WIDTH - 1);
        let start_word = upto >> SHIFT;
        let offset = upto % BIT_WIDTH;
        let w = if offset == BIT_WIDTH - 1 {
            self.bitset[start_word]
        } else {
            self.bitset[start_word] & ((StorageType::one() << (offset + 1)) - StorageType::one())
        };
        if !w.is_zero() {
            return Some((start_word << SHIFT) + (BIT_WIDTH - 1) - w.leading_zeros() as usize);
        }
        for i in (0..start_word).rev() {
            let b = self.bitset[i];
            if !b.is_zero() {
                return Some((i << SHIFT) + (BIT_WIDTH - 1) - b.leading_zeros() as usize);
            }
        }
        None
    }

    fn count(&self) -> usize {
        self.bitset.iter().map(|x| x.count_ones() as usize).sum()
    }

    fn is_empty(&self) -> bool {
        self.bitset.iter().all(|x| x.is_zero())
    }

    fn capacity(&self) -> usize {
        STORAGE_WIDTH * BIT_WIDTH
    }
}

impl<StorageType, const BIT_WIDTH: usize, const SHIFT: usize, const STORAGE_WIDTH: usize> Default
    for Bitset<StorageType, BIT_WIDTH, SHIFT, STORAGE_WIDTH>
where
    StorageType: PrimInt,
{
    fn default() -> Self {
        Self::new()
    }
}

pub type Bitset64<const STORAGE_WIDTH_U64: usize> = Bitset<u64, 64, 6, STORAGE_WIDTH_U64>;
