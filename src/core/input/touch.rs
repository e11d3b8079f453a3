#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TouchType {
    Down,
    Up,
    Motion,
    Frame,
    Cancel,
}
