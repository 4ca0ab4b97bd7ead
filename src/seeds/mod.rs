pub mod bootstrap_seed;
