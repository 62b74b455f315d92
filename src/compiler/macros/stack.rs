/*!
  The stack-frame calling convention, implemented entirely as macros over
  flat memory.

  Format of stackframes:

  | offset | value                                    |
  |--------|------------------------------------------|
  | 0      | previous frame address                   |
  | 1      | return jump offset                       |
  | 2      | return value                             |
  | 3      | number of parameters                     |
  | 4..    | parameter values                         |

  The reserved cell [`FRAME_POINTER_CELL`] holds the address of the current
  frame. `invoke` allocates the callee's frame in the cells immediately after
  the caller's, copies parameters out of the caller's frame by literal slot
  index, and jumps; `return` writes the return value slot and jumps back
  through the frame's return offset. Restoring the caller's frame pointer is
  `invoke`'s job on the resume path, where it also leaves the callee's return
  value in `#a2`. All of these clobber `#m1`, `#m2`, `#m8`, `#a1` and `#a2`.
*/

use super::{is_register_argument, literal_param, parameter_count_error, CompileError,
            CompilationContext, Location, MacroCommand};

/// The reserved memory cell holding the address of the current stack frame.
pub const FRAME_POINTER_CELL: i64 = 0xFFFE;

/// Appends every line of a statement block to `out`. Comment and blank lines
/// survive here and are dropped by the compiler's line dispatch.
fn push_block(out: &mut Vec<String>, block: String) {
  out.extend(block.lines().map(str::to_string));
}

/**
  Allocates a new stackframe, packs the given caller-frame slots into it as
  parameters, and jumps to the target (directly for a literal or label,
  indirectly for a register). On return, the callee's return value is left in
  `#a2`. Parameters 2.. name slots of the *caller's* frame by literal index.
*/
pub(super) struct Invoke;

impl MacroCommand for Invoke {
  fn name(&self) -> &'static str {
    "invoke"
  }

  fn unroll(
      &self,
      params           : &[&str],
      include_location : &Location,
      context          : &mut CompilationContext
    ) -> Result<Vec<String>, CompileError>
  {
    if params.is_empty() {
      return Err(parameter_count_error(
        self.name(), "at least 1 parameter", params.len(), include_location
      ));
    }

    let target = params[0];
    let arguments = &params[1..];

    // Caller-frame slot indices, validated before any code is emitted.
    let mut slots = Vec::with_capacity(arguments.len());
    for (index, argument) in arguments.iter().enumerate() {
      slots.push(literal_param(argument, self.name(), index + 1, include_location)?);
    }

    let return_label = format!("_invocation_return_{}", context.next_invocation());
    let mut out = Vec::new();

    push_block(&mut out, format!("\
// current stackframe address into #a1 and #m8
ldc #m1 {fp}
rcl #m1 #a1
mov #a1 #m8
// address of the parameter count slot into #a1, saved in #m1
ldc #a2 3
add
mov #a1 #m1
rcl #a1 #a1
// first cell past the current frame is the new frame address
mov #a1 #a2
mov #m1 #a1
add
inc #a1
// publish the new frame
ldc #m1 {fp}
sto #a1 #m1
// [0] previous frame address
sto #m8 #a1
// [1] return jump offset
inc #a1
ldc #m1 :{label}
sto #m1 #a1
// [2] return value slot
inc #a1
ldc #m1 0
sto #m1 #a1
// [3] parameter count
inc #a1
ldc #m1 {count}
sto #m1 #a1",
      fp = FRAME_POINTER_CELL,
      label = return_label,
      count = slots.len()
    ));

    for slot in slots {
      push_block(&mut out, format!("\
// copy caller frame slot {slot} into the next parameter cell
inc #a1
mov #a1 #m2
mov #m8 #a1
ldc #a2 {offset}
add
rcl #a1 #m1
mov #m2 #a1
sto #m1 #a1",
        slot = slot,
        offset = 4 + slot
      ));
    }

    if is_register_argument(target) {
      out.push(format!("vjmp {}", target));
    } else {
      out.push(format!("jmp {}", target));
    }

    out.push(format!(":{}", return_label));

    push_block(&mut out, format!("\
// frame address of the callee that just returned
ldc #m1 {fp}
rcl #m1 #a1
// restore the caller as the current frame
rcl #a1 #m2
sto #m2 #m1
// callee return value into #a2
inc #a1
inc #a1
rcl #a1 #a2",
      fp = FRAME_POINTER_CELL
    ));

    Ok(out)
  }
}

/**
  Writes the optional parameter into the current frame's return value slot,
  then jumps through the frame's return offset. The frame pointer itself is
  not restored here; that happens on `invoke`'s resume path.
*/
pub(super) struct Return;

impl MacroCommand for Return {
  fn name(&self) -> &'static str {
    "return"
  }

  fn unroll(
      &self,
      params           : &[&str],
      include_location : &Location,
      _context         : &mut CompilationContext
    ) -> Result<Vec<String>, CompileError>
  {
    if params.len() > 1 {
      return Err(parameter_count_error(
        self.name(), "at most 1 parameter", params.len(), include_location
      ));
    }

    let mut out = Vec::new();

    if let Some(value) = params.first() {
      // The frame pointer is loaded through #a1 alone so that any memory
      // register can carry the return value.
      push_block(&mut out, format!("\
ldc #a1 {fp}
rcl #a1 #a1
ldc #a2 2
add
// #a1 now holds the address of the return value slot",
        fp = FRAME_POINTER_CELL
      ));

      if is_register_argument(value) {
        out.push(format!("sto {} #a1", value));
      } else {
        out.push(format!("ldc #m1 {}", value));
        out.push("sto #m1 #a1".to_string());
      }

      push_block(&mut out, "\
dec #a1
// #a1 now holds the address of the return jump offset
rcl #a1 #a1
vjmp #a1".to_string());
    } else {
      push_block(&mut out, format!("\
ldc #a1 {fp}
rcl #a1 #a1
inc #a1
rcl #a1 #a1
vjmp #a1",
        fp = FRAME_POINTER_CELL
      ));
    }

    Ok(out)
  }
}

/// Enlarges the parameter space of the current stackframe by the given
/// number of cells, reserving locals beyond the passed parameters.
pub(super) struct EnlargeCurrentStackFrame;

impl MacroCommand for EnlargeCurrentStackFrame {
  fn name(&self) -> &'static str {
    "enlarge-current-stackframe"
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
    let cells = literal_param(params[0], self.name(), 1, include_location)?;

    let mut out = Vec::new();
    push_block(&mut out, format!("\
ldc #m1 {fp}
rcl #m1 #a1
ldc #a2 3
add
// #a1 holds the address of the parameter count; keep it in #m1
mov #a1 #m1
rcl #a1 #a1
ldc #a2 {cells}
add
sto #a1 #m1",
      fp = FRAME_POINTER_CELL,
      cells = cells
    ));
    Ok(out)
  }
}

/// Writes a value (register or literal) to the frame-relative slot at
/// `4 + index` of the current frame.
pub(super) struct StoreInStack;

impl MacroCommand for StoreInStack {
  fn name(&self) -> &'static str {
    "store-in-stack"
  }

  fn unroll(
      &self,
      params           : &[&str],
      include_location : &Location,
      _context         : &mut CompilationContext
    ) -> Result<Vec<String>, CompileError>
  {
    if params.len() != 2 {
      return Err(parameter_count_error(
        self.name(), "exactly 2 parameters", params.len(), include_location
      ));
    }

    let value = params[0];
    let index = literal_param(params[1], self.name(), 2, include_location)?;

    // The slot address computation runs through #a1/#a2, so they cannot
    // carry the value.
    if value.eq_ignore_ascii_case("#a1") || value.eq_ignore_ascii_case("#a2") {
      return Err(CompileError::MacroParameterShape {
        name: self.name(),
        expected: "a register other than #a1 or #a2, or a literal",
        index: 1,
        token: value.to_string(),
        location: include_location.clone()
      });
    }

    let mut out = Vec::new();
    push_block(&mut out, format!("\
ldc #a1 {fp}
rcl #a1 #a1
ldc #a2 {offset}
add
// #a1 now holds the slot address",
      fp = FRAME_POINTER_CELL,
      offset = 4 + index
    ));

    if is_register_argument(value) {
      out.push(format!("sto {} #a1", value));
    } else {
      out.push(format!("ldc #m1 {}", value));
      out.push("sto #m1 #a1".to_string());
    }

    Ok(out)
  }
}

/// Recalls the frame-relative slot at `4 + index` of the current frame into
/// the given destination register.
pub(super) struct RecallFromStack;

impl MacroCommand for RecallFromStack {
  fn name(&self) -> &'static str {
    "recall-from-stack"
  }

  fn unroll(
      &self,
      params           : &[&str],
      include_location : &Location,
      _context         : &mut CompilationContext
    ) -> Result<Vec<String>, CompileError>
  {
    if params.len() != 2 {
      return Err(parameter_count_error(
        self.name(), "exactly 2 parameters", params.len(), include_location
      ));
    }

    let index = literal_param(params[0], self.name(), 1, include_location)?;
    let destination = params[1];
    if !is_register_argument(destination) {
      return Err(CompileError::MacroParameterShape {
        name: self.name(),
        expected: "a register",
        index: 2,
        token: destination.to_string(),
        location: include_location.clone()
      });
    }

    let mut out = Vec::new();
    push_block(&mut out, format!("\
ldc #m1 {fp}
rcl #m1 #a1
ldc #a2 {offset}
add
rcl #a1 {destination}",
      fp = FRAME_POINTER_CELL,
      offset = 4 + index,
      destination = destination
    ));
    Ok(out)
  }
}

/// Emits a memory dump covering the current frame's full extent: from the
/// frame address through its last parameter cell.
pub(super) struct DebugCurrentStackFrame;

impl MacroCommand for DebugCurrentStackFrame {
  fn name(&self) -> &'static str {
    "debug-current-stackframe"
  }

  fn unroll(
      &self,
      params           : &[&str],
      include_location : &Location,
      _context         : &mut CompilationContext
    ) -> Result<Vec<String>, CompileError>
  {
    if !params.is_empty() {
      return Err(parameter_count_error(
        self.name(), "no parameters", params.len(), include_location
      ));
    }

    let mut out = Vec::new();
    push_block(&mut out, format!("\
// frame start into #m2
ldc #m1 {fp}
rcl #m1 #a1
mov #a1 #m2
// frame end = frame + 3 + parameter count, into #m3
ldc #a2 3
add
rcl #a1 #a2
add
mov #a1 #m3
debug_memory_range #m2 #m3",
      fp = FRAME_POINTER_CELL
    ));
    Ok(out)
  }
}
