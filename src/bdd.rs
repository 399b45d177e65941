//! The BDD manager.
//!
//! Every diagram lives inside a single [`Bdd`] manager. Nodes are hash-consed in a unique table,
//! so two [`Ref`]s are equal iff they denote the same Boolean function. Edges may be complemented,
//! which makes negation a constant-time operation; the high edge of a stored node is never
//! complemented, which keeps the representation canonical.
//!
//! Variables are 1-indexed and the variable order coincides with the index: smaller indices are
//! closer to the root. There is no dynamic reordering.
//!
//! All operations take `&self`. The unique table and the computed table live behind `RefCell`s,
//! so a manager is cheap to share through an `Rc` but is not `Sync`.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt::Debug;

use log::debug;

use crate::cache::{Cache, IteKey};
use crate::config::BddConfig;
use crate::node::Node;
use crate::reference::Ref;
use crate::table::Table;

pub struct Bdd {
    storage: RefCell<Table<Node>>,
    cache: RefCell<Cache<IteKey, Ref>>,
}

impl Bdd {
    pub fn new(storage_bits: usize) -> Self {
        Self::with_config(&BddConfig {
            storage_bits,
            cache_bits: storage_bits.min(16),
        })
    }

    pub fn with_config(config: &BddConfig) -> Self {
        let mut storage = Table::new(config.storage_bits, Node::TERMINAL);

        // Allocate the terminal node:
        let one = storage.add(Node::TERMINAL);
        assert_eq!(one, 1); // Make sure the terminal node is (1).

        Self {
            storage: RefCell::new(storage),
            cache: RefCell::new(Cache::new(config.cache_bits)),
        }
    }
}

impl Default for Bdd {
    fn default() -> Self {
        Bdd::with_config(&BddConfig::default())
    }
}

impl Debug for Bdd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let storage = self.storage.borrow();
        let cache = self.cache.borrow();
        f.debug_struct("Bdd")
            .field("size", &storage.size())
            .field("buckets", &storage.num_buckets())
            .field("cache_hits", &cache.hits())
            .field("cache_misses", &cache.misses())
            .finish()
    }
}

impl Bdd {
    pub fn variable(&self, index: u32) -> u32 {
        self.storage.borrow().value(index as usize).variable
    }
    pub fn low(&self, index: u32) -> Ref {
        self.storage.borrow().value(index as usize).low
    }
    pub fn high(&self, index: u32) -> Ref {
        self.storage.borrow().value(index as usize).high
    }

    pub fn low_node(&self, node: Ref) -> Ref {
        let low = self.low(node.index());
        if node.is_negated() {
            -low
        } else {
            low
        }
    }
    pub fn high_node(&self, node: Ref) -> Ref {
        let high = self.high(node.index());
        if node.is_negated() {
            -high
        } else {
            high
        }
    }

    pub fn is_zero(&self, node: Ref) -> bool {
        node == Ref::ZERO
    }
    pub fn is_one(&self, node: Ref) -> bool {
        node == Ref::ONE
    }
    pub fn is_terminal(&self, node: Ref) -> bool {
        node.index() == 1
    }

    /// Position of the top variable of `node` in the order; terminals sit below every variable.
    pub fn level(&self, node: Ref) -> u32 {
        if self.is_terminal(node) {
            u32::MAX
        } else {
            self.variable(node.index())
        }
    }

    /// Number of nodes stored in the unique table, including the terminal.
    pub fn node_count(&self) -> usize {
        self.storage.borrow().size()
    }

    /// Computed-table statistics as `(hits, misses)`.
    pub fn cache_stats(&self) -> (usize, usize) {
        let cache = self.cache.borrow();
        (cache.hits(), cache.misses())
    }

    pub fn mk_node(&self, v: u32, low: Ref, high: Ref) -> Ref {
        assert_ne!(v, 0, "Variable index should not be zero");

        // Handle canonicity
        if high.is_negated() {
            return -self.mk_node(v, -low, -high);
        }

        // Handle duplicates
        if low == high {
            return low;
        }

        let i = self.storage.borrow_mut().put(Node { variable: v, low, high });
        Ref::positive(i as u32)
    }

    pub fn mk_var(&self, v: u32) -> Ref {
        self.mk_node(v, Ref::ZERO, Ref::ONE)
    }

    /// Conjunction of signed literals (DIMACS-style: `-3` means "not x3").
    pub fn cube(&self, literals: impl IntoIterator<Item = i32>) -> Ref {
        let mut literals = literals.into_iter().collect::<Vec<_>>();
        literals.sort_by_key(|&lit| std::cmp::Reverse(lit.unsigned_abs()));
        debug!("cube(literals = {:?})", literals);
        let mut current = Ref::ONE;
        for lit in literals {
            assert_ne!(lit, 0, "Variable index should not be zero");
            let v = lit.unsigned_abs();
            current = if lit < 0 {
                self.mk_node(v, current, Ref::ZERO)
            } else {
                self.mk_node(v, Ref::ZERO, current)
            };
        }
        current
    }

    pub fn top_cofactors(&self, node: Ref, v: u32) -> (Ref, Ref) {
        assert_ne!(v, 0, "Variable index should not be zero");

        if v < self.level(node) {
            return (node, node);
        }
        assert_eq!(v, self.level(node));
        (self.low_node(node), self.high_node(node))
    }

    /// Apply the ITE operation to the arguments.
    ///
    /// ```text
    /// ITE(f, g, h) = (f ∧ g) ∨ (¬f ∧ h)
    /// ```
    ///
    /// Arguments are brought to a standard triple before the computed table is consulted:
    /// `f` and `g` are always regular, and an argument equal to `f` (or `¬f`) is replaced by a constant.
    pub fn apply_ite(&self, f: Ref, g: Ref, h: Ref) -> Ref {
        // ite(1,G,H) => G
        // ite(0,G,H) => H
        if self.is_one(f) {
            return g;
        }
        if self.is_zero(f) {
            return h;
        }

        // ite(F,F,H) => ite(F,1,H)
        // ite(F,~F,H) => ite(F,0,H)
        // ite(F,G,F) => ite(F,G,0)
        // ite(F,G,~F) => ite(F,G,1)
        let g = if g == f {
            Ref::ONE
        } else if g == -f {
            Ref::ZERO
        } else {
            g
        };
        let h = if h == f {
            Ref::ZERO
        } else if h == -f {
            Ref::ONE
        } else {
            h
        };

        // ite(F,G,G) => G
        // ite(F,1,0) => F
        // ite(F,0,1) => ~F
        if g == h {
            return g;
        }
        if self.is_one(g) && self.is_zero(h) {
            return f;
        }
        if self.is_zero(g) && self.is_one(h) {
            return -f;
        }

        // ite(~F,G,H) => ite(F,H,G)
        let (f, g, h) = if f.is_negated() { (-f, h, g) } else { (f, g, h) };
        // ite(F,~G,H) => ~ite(F,G,~H)
        let (g, h, negate) = if g.is_negated() { (-g, -h, true) } else { (g, h, false) };

        let key = IteKey(f, g, h);
        let cached = self.cache.borrow().get(&key).copied();
        let res = match cached {
            Some(res) => res,
            None => {
                let m = self.level(f).min(self.level(g)).min(self.level(h));
                let (f0, f1) = self.top_cofactors(f, m);
                let (g0, g1) = self.top_cofactors(g, m);
                let (h0, h1) = self.top_cofactors(h, m);

                let e = self.apply_ite(f0, g0, h0);
                let t = self.apply_ite(f1, g1, h1);
                let res = self.mk_node(m, e, t);
                self.cache.borrow_mut().insert(key, res);
                res
            }
        };

        if negate {
            -res
        } else {
            res
        }
    }

    pub fn apply_not(&self, f: Ref) -> Ref {
        -f
    }

    pub fn apply_and(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, Ref::ZERO)
    }

    pub fn apply_or(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, Ref::ONE, v)
    }

    pub fn apply_xor(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, -v, v)
    }

    pub fn apply_eq(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, -v)
    }

    pub fn apply_imply(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, Ref::ONE)
    }

    pub fn apply_and_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Ref {
        let mut res = Ref::ONE;
        for node in nodes {
            res = self.apply_and(res, node);
            if self.is_zero(res) {
                break;
            }
        }
        res
    }

    pub fn apply_or_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Ref {
        let mut res = Ref::ZERO;
        for node in nodes {
            res = self.apply_or(res, node);
            if self.is_one(res) {
                break;
            }
        }
        res
    }

    /// Whether `f → g` is valid.
    pub fn is_implies(&self, f: Ref, g: Ref) -> bool {
        self.is_one(self.apply_imply(f, g))
    }

    // f|v<-b
    pub fn restrict(&self, f: Ref, v: u32, b: bool) -> Ref {
        let mut cache = HashMap::new();
        self.restrict_(f, v, b, &mut cache)
    }

    fn restrict_(&self, f: Ref, v: u32, b: bool, cache: &mut HashMap<Ref, Ref>) -> Ref {
        assert_ne!(v, 0, "Variable index should not be zero");

        let i = self.level(f);
        if v < i {
            // 'f' does not depend on 'v'
            return f;
        }
        if v == i {
            return if b { self.high_node(f) } else { self.low_node(f) };
        }

        if let Some(&res) = cache.get(&f) {
            return res;
        }

        let low = self.restrict_(self.low_node(f), v, b, cache);
        let high = self.restrict_(self.high_node(f), v, b, cache);
        let res = self.mk_node(i, low, high);
        cache.insert(f, res);
        res
    }

    // f|v<-g
    pub fn compose(&self, f: Ref, v: u32, g: Ref) -> Ref {
        debug!("compose(f = {}, v = {}, g = {})", f, v, g);
        let f1 = self.restrict(f, v, true);
        let f0 = self.restrict(f, v, false);
        self.apply_ite(g, f1, f0)
    }

    /// Simultaneously substitute every variable in `subst` by its image.
    ///
    /// Variables missing from `subst` are left untouched.
    pub fn vector_compose(&self, f: Ref, subst: &HashMap<u32, Ref>) -> Ref {
        debug!("vector_compose(f = {}, |subst| = {})", f, subst.len());
        if subst.is_empty() {
            return f;
        }
        let mut cache = HashMap::new();
        self.vector_compose_(f, subst, &mut cache)
    }

    fn vector_compose_(&self, f: Ref, subst: &HashMap<u32, Ref>, cache: &mut HashMap<Ref, Ref>) -> Ref {
        if self.is_terminal(f) {
            return f;
        }
        if f.is_negated() {
            return -self.vector_compose_(-f, subst, cache);
        }
        if let Some(&res) = cache.get(&f) {
            return res;
        }

        let v = self.level(f);
        let e = self.vector_compose_(self.low_node(f), subst, cache);
        let t = self.vector_compose_(self.high_node(f), subst, cache);
        let x = match subst.get(&v) {
            Some(&g) => g,
            None => self.mk_var(v),
        };
        let res = self.apply_ite(x, t, e);
        cache.insert(f, res);
        res
    }

    /// Existential quantification over all variables in `vars`.
    pub fn exists(&self, f: Ref, vars: &[u32]) -> Ref {
        let mut vars = vars.to_vec();
        vars.sort_unstable();
        vars.dedup();
        debug!("exists(f = {}, vars = {:?})", f, vars);
        let mut cache = HashMap::new();
        self.exists_(f, &vars, &mut cache)
    }

    fn exists_(&self, f: Ref, vars: &[u32], cache: &mut HashMap<Ref, Ref>) -> Ref {
        if self.is_terminal(f) {
            return f;
        }

        // Quantified variables above the top of `f` do not matter.
        let v = self.level(f);
        let vars = &vars[vars.partition_point(|&x| x < v)..];
        if vars.is_empty() {
            return f;
        }

        if let Some(&res) = cache.get(&f) {
            return res;
        }

        let e = self.exists_(self.low_node(f), vars, cache);
        let res = if vars[0] == v {
            if self.is_one(e) {
                e
            } else {
                let t = self.exists_(self.high_node(f), vars, cache);
                self.apply_or(e, t)
            }
        } else {
            let t = self.exists_(self.high_node(f), vars, cache);
            self.mk_node(v, e, t)
        };
        cache.insert(f, res);
        res
    }

    /// Universal quantification over all variables in `vars`.
    pub fn forall(&self, f: Ref, vars: &[u32]) -> Ref {
        -self.exists(-f, vars)
    }

    /// Evaluate `f` under a total assignment.
    pub fn eval(&self, f: Ref, assignment: impl Fn(u32) -> bool) -> bool {
        let mut current = f;
        while !self.is_terminal(current) {
            let v = self.variable(current.index());
            current = if assignment(v) {
                self.high_node(current)
            } else {
                self.low_node(current)
            };
        }
        self.is_one(current)
    }

    pub fn descendants(&self, nodes: impl IntoIterator<Item = Ref>) -> HashSet<u32> {
        let mut visited = HashSet::new();
        visited.insert(1);
        let mut queue = VecDeque::from_iter(nodes);

        while let Some(node) = queue.pop_front() {
            let i = node.index();
            if visited.insert(i) {
                queue.push_back(self.low(i));
                queue.push_back(self.high(i));
            }
        }

        visited
    }

    /// Variables `f` depends on.
    pub fn support(&self, f: Ref) -> BTreeSet<u32> {
        self.descendants([f])
            .into_iter()
            .filter(|&i| i != 1)
            .map(|i| self.variable(i))
            .collect()
    }

    /// Number of distinct nodes (terminal included) reachable from `f`.
    pub fn size(&self, f: Ref) -> u64 {
        self.descendants([f]).len() as u64
    }
}
