use std::fmt;

/// Index of a decision variable within a [Model](crate::model::Model)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub(crate) usize);

impl VarId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VarKind {
    /// `{0, 1}` indicator
    Binary,
    /// real value in `[lower, upper]` (`upper` may be infinite)
    Continuous { lower: f64, upper: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub kind: VarKind,
}

/// Affine expression `sum_v a[v] * v + b`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    terms: Vec<(VarId, f64)>,
    constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constant(value: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    /// Add `coef * var` to this expression. Zero coefficients are dropped.
    pub fn term(mut self, var: VarId, coef: f64) -> Self {
        self.push(var, coef);
        self
    }

    pub fn push(&mut self, var: VarId, coef: f64) {
        if coef != 0. {
            self.terms.push((var, coef));
        }
    }

    pub fn terms(&self) -> &[(VarId, f64)] {
        &self.terms
    }

    pub fn offset(&self) -> f64 {
        self.constant
    }

    /// Value of this expression for given variable `values` (indexed by [VarId::index]).
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|&(v, a)| a * values[v.index()])
            .sum::<f64>()
            + self.constant
    }
}

impl FromIterator<(VarId, f64)> for LinearExpr {
    fn from_iter<I: IntoIterator<Item = (VarId, f64)>>(iter: I) -> Self {
        let mut expr = Self::new();
        for (v, a) in iter {
            expr.push(v, a);
        }
        expr
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Eq,
    Le,
    Ge,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq => write!(f, "=="),
            Self::Le => write!(f, "<="),
            Self::Ge => write!(f, ">="),
        }
    }
}

/// Linear constraint `lhs (==|<=|>=) rhs`
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub name: String,
    pub lhs: LinearExpr,
    pub relation: Relation,
    pub rhs: f64,
}

impl Constraint {
    pub fn new(name: impl Into<String>, lhs: LinearExpr, relation: Relation, rhs: f64) -> Self {
        Self {
            name: name.into(),
            lhs,
            relation,
            rhs,
        }
    }

    /// Signed violation of this constraint for given `values` (zero or negative when satisfied).
    pub fn violation(&self, values: &[f64]) -> f64 {
        let lhs = self.lhs.evaluate(values);
        match self.relation {
            Relation::Eq => (lhs - self.rhs).abs(),
            Relation::Le => lhs - self.rhs,
            Relation::Ge => self.rhs - lhs,
        }
    }
}
