pub mod lifecycle;
pub mod qr;
pub mod token;
pub mod visits;
