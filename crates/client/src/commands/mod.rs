pub mod check;
pub mod play;
pub mod replay;
