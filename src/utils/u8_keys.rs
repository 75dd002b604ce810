/// Position of `key` within the sorted occupied region of a key array.
#[inline]
pub fn u8_keys_find_key_position_sorted(key: u8, keys: &[u8]) -> Option<usize> {
    // The occupied regions are at most 16 entries, a linear scan beats binary
    // search at this width.
    for (i, k) in keys.iter().enumerate() {
        if *k == key {
            return Some(i);
        }
        if *k > key {
            return None;
        }
    }
    None
}

/// Position at which `key` keeps the occupied region of a key array sorted.
#[inline]
pub fn u8_keys_find_insert_position_sorted(key: u8, keys: &[u8]) -> usize {
    for (i, k) in keys.iter().enumerate() {
        if *k > key {
            return i;
        }
    }
    keys.len()
}

#[cfg(test)]
mod tests {
    use super::{u8_keys_find_insert_position_sorted, u8_keys_find_key_position_sorted};

    #[test]
    fn test_find_sorted() {
        let keys = [2u8, 5, 9, 200];
        assert_eq!(u8_keys_find_key_position_sorted(2, &keys), Some(0));
        assert_eq!(u8_keys_find_key_position_sorted(9, &keys), Some(2));
        assert_eq!(u8_keys_find_key_position_sorted(200, &keys), Some(3));
        assert_eq!(u8_keys_find_key_position_sorted(3, &keys), None);
        assert_eq!(u8_keys_find_key_position_sorted(201, &keys), None);
        assert_eq!(u8_keys_find_key_position_sorted(0, &[]), None);
    }

    #[test]
    fn test_insert_position_sorted() {
        let keys = [2u8, 5, 9];
        assert_eq!(u8_keys_find_insert_position_sorted(0, &keys), 0);
        assert_eq!(u8_keys_find_insert_position_sorted(3, &keys), 1);
        assert_eq!(u8_keys_find_insert_position_sorted(9, &keys), 3);
        assert_eq!(u8_keys_find_insert_position_sorted(255, &keys), 3);
        assert_eq!(u8_keys_find_insert_position_sorted(7, &[]), 0);
    }
}
