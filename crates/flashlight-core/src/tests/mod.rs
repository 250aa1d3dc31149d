// Crate level test module
#[cfg(test)]
mod integration;
