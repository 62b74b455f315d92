/*!
  Macros that persist or restore the whole general-purpose register block as
  eight consecutive memory cells.
*/

use super::{is_register_argument, parameter_count_error, CompileError, CompilationContext,
            Location, MacroCommand};

/// Seeds `#a2` with the block address: moved from a register parameter, or
/// loaded from a literal. A register parameter that already is `#a2` needs
/// no instruction at all.
fn block_address_into_a2(target: &str, out: &mut Vec<String>) {
  if is_register_argument(target) {
    if !target.eq_ignore_ascii_case("#a2") {
      out.push(format!("mov {} #a2", target));
    }
  } else {
    out.push(format!("ldc #a2 {}", target));
  }
}

/// Persists all eight memory registers to consecutive cells starting at the
/// given address (literal, or read from a register). Clobbers `#a2`.
pub(super) struct StoreAllRegisters;

impl MacroCommand for StoreAllRegisters {
  fn name(&self) -> &'static str {
    "store-all-registers"
  }

  fn unroll(
      &self,
      params           : &[&str],
      include_location : &Location,
      _context         : &mut CompilationContext
    ) -> Result<Vec<String>, CompileError>
  {
    if params.len() != 1 {
      return Err(parameter_count_error(
        self.name(), "exactly 1 parameter", params.len(), include_location
      ));
    }

    let mut out = Vec::new();
    block_address_into_a2(params[0], &mut out);
    for register in 1..=8 {
      out.push(format!("sto #m{} #a2", register));
      out.push("inc #a2".to_string());
    }
    Ok(out)
  }
}

/// Fills all eight memory registers from consecutive cells starting at the
/// given address. Clobbers `#a2`.
pub(super) struct RecallAllRegisters;

impl MacroCommand for RecallAllRegisters {
  fn name(&self) -> &'static str {
    "recall-all-registers"
  }

  fn unroll(
      &self,
      params           : &[&str],
      include_location : &Location,
      _context         : &mut CompilationContext
    ) -> Result<Vec<String>, CompileError>
  {
    if params.len() != 1 {
      return Err(parameter_count_error(
        self.name(), "exactly 1 parameter", params.len(), include_location
      ));
    }

    let mut out = Vec::new();
    block_address_into_a2(params[0], &mut out);
    for register in 1..=8 {
      out.push(format!("rcl #a2 #m{}", register));
      out.push("inc #a2".to_string());
    }
    Ok(out)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn unroll(command: &dyn MacroCommand, params: &[&str]) -> Result<Vec<String>, CompileError> {
    let mut context = CompilationContext::new();
    command.unroll(params, &Location::new("test.asm", 1), &mut context)
  }

  #[test]
  fn store_unrolls_to_sto_inc_pairs() {
    let statements = unroll(&StoreAllRegisters, &["100"]).unwrap();
    assert_eq!(statements.len(), 17);
    assert_eq!(statements[0], "ldc #a2 100");
    assert_eq!(statements[1], "sto #m1 #a2");
    assert_eq!(statements[2], "inc #a2");
    assert_eq!(statements[15], "sto #m8 #a2");
  }

  #[test]
  fn register_address_is_moved_not_loaded() {
    let statements = unroll(&RecallAllRegisters, &["#m4"]).unwrap();
    assert_eq!(statements[0], "mov #m4 #a2");
    assert_eq!(statements[1], "rcl #a2 #m1");
  }

  #[test]
  fn address_already_in_a2_needs_no_setup() {
    let statements = unroll(&StoreAllRegisters, &["#A2"]).unwrap();
    assert_eq!(statements[0], "sto #m1 #a2");
    assert_eq!(statements.len(), 16);
  }

  #[test]
  fn parameter_count_is_validated() {
    assert!(matches!(
      unroll(&StoreAllRegisters, &[]),
      Err(CompileError::MacroParameterCount { name: "store-all-registers", .. })
    ));
    assert!(matches!(
      unroll(&RecallAllRegisters, &["1", "2"]),
      Err(CompileError::MacroParameterCount { .. })
    ));
  }
}
