use std::collections::HashMap;

use num_bigint::BigUint;

use crate::bdd::Bdd;
use crate::reference::Ref;

impl Bdd {
    /// Returns one satisfying path of `node` as signed literals, or `None` for the constant false.
    ///
    /// Variables not on the path are left out: any value satisfies the function.
    pub fn one_sat(&self, node: Ref) -> Option<Vec<i32>> {
        if self.is_zero(node) {
            return None;
        }

        let mut path = Vec::new();
        let mut current = node;
        while !self.is_one(current) {
            let v = self.variable(current.index()) as i32;
            let high = self.high_node(current);
            if !self.is_zero(high) {
                path.push(v);
                current = high;
            } else {
                path.push(-v);
                current = self.low_node(current);
            }
        }

        Some(path)
    }

    /// Number of satisfying assignments of `node` over `num_vars` variables.
    ///
    /// The support of `node` must be included in the counted variables.
    pub fn sat_count(&self, node: Ref, num_vars: usize) -> BigUint {
        let mut cache = HashMap::new();
        let max = BigUint::from(1u32) << num_vars;
        self.sat_count_(node, &max, &mut cache)
    }

    fn sat_count_(&self, node: Ref, max: &BigUint, cache: &mut HashMap<Ref, BigUint>) -> BigUint {
        if self.is_zero(node) {
            return BigUint::ZERO;
        } else if self.is_one(node) {
            return max.clone();
        }

        if let Some(count) = cache.get(&node) {
            return count.clone();
        }

        let count_low = self.sat_count_(self.low_node(node), max, cache);
        let count_high = self.sat_count_(self.high_node(node), max, cache);
        let count: BigUint = (count_low + count_high) >> 1;

        cache.insert(node, count.clone());
        count
    }
}
