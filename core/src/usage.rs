//! Usage rendering seam.
//!
//! The engine never formats help text itself. Front ends implement
//! [`UsagePrinter`] over the public descriptor accessors.

use std::fmt;

use crate::types::CommandDescriptor;

/// Renders usage text for a command subtree.
pub trait UsagePrinter {
    /// Writes usage for `command` (and whatever part of its subtree the
    /// printer chooses) into `out`.
    fn print(&self, command: &CommandDescriptor, out: &mut dyn fmt::Write) -> fmt::Result;

    /// Convenience wrapper collecting the output into a `String`.
    fn render(&self, command: &CommandDescriptor) -> Result<String, fmt::Error> {
        let mut out = String::new();
        self.print(command, &mut out)?;
        Ok(out)
    }
}
