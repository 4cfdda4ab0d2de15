pub mod canvas_ops;
pub mod fill;
pub mod scripting;
pub mod stroke;
