/*!
  The flat addressable memory: a bounds-checked, resizable store of 64-bit
  cells. Compiled code is written into the same address space that programs
  use for data; there is no code/data segmentation.
*/

use thiserror::Error;

/// Default number of cells in a fresh memory.
pub const DEFAULT_MEMORY_SIZE: usize = 0xFFFF;

#[derive(Error, Clone, Debug, Eq, PartialEq)]
pub enum MemoryError {
  #[error("address {address} exceeds the memory space of {size} cells")]
  BoundsExceeded {
    address: i64,
    size: usize
  },
}

/// Models variable-sized memory. Out-of-range access is always an error;
/// growth only ever happens through [`Memory::resize`].
pub struct Memory {
  data: Vec<i64>,
}

impl Memory {

  pub fn new() -> Memory {
    Memory::with_size(DEFAULT_MEMORY_SIZE)
  }

  pub fn with_size(size: usize) -> Memory {
    Memory { data: vec![0; size] }
  }

  pub fn size(&self) -> usize {
    self.data.len()
  }

  pub fn get(&self, address: i64) -> Result<i64, MemoryError> {
    let index = self.checked_index(address)?;
    Ok(self.data[index])
  }

  pub fn set(&mut self, address: i64, value: i64) -> Result<(), MemoryError> {
    let index = self.checked_index(address)?;
    self.data[index] = value;
    Ok(())
  }

  /// Grows or truncates the memory. Existing cells are preserved up to the
  /// smaller of the two sizes; newly grown cells read zero.
  pub fn resize(&mut self, new_size: usize) {
    self.data.resize(new_size, 0);
  }

  fn checked_index(&self, address: i64) -> Result<usize, MemoryError> {
    if address < 0 || address as usize >= self.data.len() {
      return Err(MemoryError::BoundsExceeded {
        address,
        size: self.data.len()
      });
    }
    Ok(address as usize)
  }
}

impl Default for Memory {
  fn default() -> Memory {
    Memory::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn get_returns_what_set_stored() {
    let mut memory = Memory::with_size(16);
    memory.set(3, -42).unwrap();
    assert_eq!(memory.get(3), Ok(-42));
    assert_eq!(memory.get(4), Ok(0));
  }

  #[test]
  fn access_out_of_bounds_fails() {
    let mut memory = Memory::with_size(8);
    assert_eq!(
      memory.get(8),
      Err(MemoryError::BoundsExceeded { address: 8, size: 8 })
    );
    assert_eq!(
      memory.set(-1, 0),
      Err(MemoryError::BoundsExceeded { address: -1, size: 8 })
    );
  }

  #[test]
  fn resize_preserves_and_zero_fills() {
    let mut memory = Memory::with_size(4);
    memory.set(2, 7).unwrap();

    memory.resize(8);
    assert_eq!(memory.size(), 8);
    assert_eq!(memory.get(2), Ok(7));
    assert_eq!(memory.get(7), Ok(0));

    memory.resize(2);
    assert_eq!(memory.size(), 2);
    assert!(memory.get(2).is_err());
  }

  #[test]
  fn no_implicit_growth_on_write() {
    let mut memory = Memory::with_size(4);
    assert!(memory.set(4, 1).is_err());
    assert_eq!(memory.size(), 4);
  }
}
