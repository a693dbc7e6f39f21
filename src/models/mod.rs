pub mod action;
pub mod perk;
