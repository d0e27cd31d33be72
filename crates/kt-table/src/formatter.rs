//! Mapping resources to display rows.

/// One display row: a cell string per column.
pub type Row = Vec<String>;

/// Turns one resource snapshot into one display row.
///
/// Implementations are per resource kind; everything else about a table is
/// shared. Formatting must tolerate partially populated resources and fall
/// back to zero values rather than fail.
pub trait RowFormatter: Send + Sync + 'static {
    /// The resource type this formatter understands.
    type Resource: Send + 'static;

    /// Column names. The length fixes the column count of the table.
    fn header(&self) -> Row;

    /// Identity key of `resource`, or `None` when it carries no usable name.
    fn key(&self, resource: &Self::Resource) -> Option<String>;

    /// Cells for `resource`, in header order.
    fn format(&self, resource: &Self::Resource) -> Row;
}
