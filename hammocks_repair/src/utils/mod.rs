/// Disjoint-set union
pub mod dsu;

#[cfg(test)]
pub mod test_utils;
