/// Shared mixin for addressable entities: nodes, pins, pipes and the graph
/// all carry a mutable name used in diagnostics and in auto-generated pipe
/// names.
pub trait Named {
    fn name(&self) -> &str;

    /// Change the name, returning the previous one. Implementors cascade the
    /// rename where names are derived (node → pins → pipes).
    fn rename(&mut self, to: &str) -> String;
}
