pub mod assignable;
