/// An optional collaborator, resolved once at startup.
///
/// Pipeline code branches on this value instead of on whether construction
/// happened to fail somewhere earlier.
#[derive(Debug, Clone)]
pub enum Capability<T> {
    Present(T),
    Absent,
}

impl<T> Capability<T> {
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }
}
