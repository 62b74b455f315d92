/*!
  Source locations for diagnostics. A location in a macro body carries the
  call site it was expanded from, and call sites nest, so locations form a
  chain that `Display` unwinds: "body on line N (included from call site)".
*/

use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Location {
  pub file: String,
  pub line: u32,
  /// The call site this line was expanded from, when the line lives inside a
  /// macro body.
  pub included_from: Option<Box<Location>>,
}

impl Location {

  pub fn new(file: impl Into<String>, line: u32) -> Location {
    Location {
      file: file.into(),
      line,
      included_from: None
    }
  }

  /// Chains this location onto the call site it was expanded from.
  pub fn included_from(mut self, include_site: Location) -> Location {
    self.included_from = Some(Box::new(include_site));
    self
  }
}

impl Display for Location {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} on line {}", self.file, self.line)?;
    if let Some(include_site) = &self.included_from {
      write!(f, " (included from {})", include_site)?;
    }
    Ok(())
  }
}
