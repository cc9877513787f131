pub mod time;

#[cfg(test)]
pub mod testing;
