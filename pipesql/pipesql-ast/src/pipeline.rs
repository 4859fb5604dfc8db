use serde::{Deserialize, Serialize};
use strum::AsRefStr;

use crate::{Expr, Lambda, Ty};

/// A pipeline: an entity source followed by operators, innermost first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Name of the entity type the pipeline starts from.
    pub source: String,
    #[serde(default)]
    pub operators: Vec<Operator>,
}

/// One stage of a pipeline.
///
/// Argument shapes are fixed here, when the pipeline is built. Several
/// operators are representable but not translatable; the compiler rejects
/// them with an "unsupported operator" error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, AsRefStr)]
pub enum Operator {
    Where(Lambda),
    Select(Lambda),
    OrderBy {
        key: Lambda,
        #[serde(default)]
        descending: bool,
    },
    ThenBy {
        key: Lambda,
        #[serde(default)]
        descending: bool,
    },
    Skip(Expr),
    Take(Expr),
    Distinct,
    Reverse,

    Any(Option<Lambda>),
    All(Lambda),
    Count(Option<Lambda>),
    LongCount(Option<Lambda>),
    Sum(Option<Lambda>),
    Average(Option<Lambda>),
    Min(Option<Lambda>),
    Max(Option<Lambda>),
    First {
        predicate: Option<Lambda>,
        #[serde(default)]
        or_default: bool,
    },
    Last {
        predicate: Option<Lambda>,
        #[serde(default)]
        or_default: bool,
    },
    Single {
        predicate: Option<Lambda>,
        #[serde(default)]
        or_default: bool,
    },
    ElementAt {
        index: Expr,
        #[serde(default)]
        or_default: bool,
    },

    Cast(Ty),
    OfType(Ty),
    Contains(Expr),
    DefaultIfEmpty(Option<Expr>),
    Concat(Box<Query>),
    Union(Box<Query>),
    Intersect(Box<Query>),
    Except(Box<Query>),
    Zip(Box<Query>),
    GroupBy {
        key: Lambda,
        element: Option<Lambda>,
    },
    Join {
        inner: Box<Query>,
        outer_key: Lambda,
        inner_key: Lambda,
        result: Lambda,
    },
    GroupJoin {
        inner: Box<Query>,
        outer_key: Lambda,
        inner_key: Lambda,
        result: Lambda,
    },
    SelectMany(Lambda),
    SkipWhile(Lambda),
    TakeWhile(Lambda),
}

impl Operator {
    /// Name of the operator, including its `Descending` or `OrDefault` suffix.
    pub fn name(&self) -> String {
        let suffix = match self {
            Operator::OrderBy {
                descending: true, ..
            }
            | Operator::ThenBy {
                descending: true, ..
            } => "Descending",
            Operator::First {
                or_default: true, ..
            }
            | Operator::Last {
                or_default: true, ..
            }
            | Operator::Single {
                or_default: true, ..
            }
            | Operator::ElementAt {
                or_default: true, ..
            } => "OrDefault",
            _ => "",
        };
        format!("{}{suffix}", self.as_ref())
    }
}

impl Query {
    pub fn from<S: ToString>(source: S) -> Self {
        Query {
            source: source.to_string(),
            operators: Vec::new(),
        }
    }

    /// Appends an operator to the pipeline.
    pub fn then(mut self, operator: Operator) -> Self {
        self.operators.push(operator);
        self
    }

    pub fn filter(self, predicate: Lambda) -> Self {
        self.then(Operator::Where(predicate))
    }

    pub fn select(self, selector: Lambda) -> Self {
        self.then(Operator::Select(selector))
    }

    pub fn order_by(self, key: Lambda) -> Self {
        self.then(Operator::OrderBy {
            key,
            descending: false,
        })
    }

    pub fn order_by_descending(self, key: Lambda) -> Self {
        self.then(Operator::OrderBy {
            key,
            descending: true,
        })
    }

    pub fn then_by(self, key: Lambda) -> Self {
        self.then(Operator::ThenBy {
            key,
            descending: false,
        })
    }

    pub fn then_by_descending(self, key: Lambda) -> Self {
        self.then(Operator::ThenBy {
            key,
            descending: true,
        })
    }

    pub fn skip<E: Into<Expr>>(self, count: E) -> Self {
        self.then(Operator::Skip(count.into()))
    }

    pub fn take<E: Into<Expr>>(self, count: E) -> Self {
        self.then(Operator::Take(count.into()))
    }

    pub fn distinct(self) -> Self {
        self.then(Operator::Distinct)
    }

    pub fn any(self, predicate: Option<Lambda>) -> Self {
        self.then(Operator::Any(predicate))
    }

    pub fn count(self, predicate: Option<Lambda>) -> Self {
        self.then(Operator::Count(predicate))
    }

    pub fn first(self, predicate: Option<Lambda>) -> Self {
        self.then(Operator::First {
            predicate,
            or_default: false,
        })
    }

    pub fn last(self, predicate: Option<Lambda>) -> Self {
        self.then(Operator::Last {
            predicate,
            or_default: false,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lambda;

    #[test]
    fn names() {
        let ops = Query::from("Person")
            .order_by_descending(lambda("x", |x| x.member("Name")))
            .then(Operator::Single {
                predicate: None,
                or_default: true,
            })
            .then(Operator::Distinct)
            .operators;

        let names: Vec<_> = ops.iter().map(Operator::name).collect();
        assert_eq!(names, ["OrderByDescending", "SingleOrDefault", "Distinct"]);
    }

    #[test]
    fn json() {
        let query = Query::from("Person")
            .filter(lambda("x", |x| x.member("Age").gte(18)))
            .take(5);

        let json = serde_json::to_string(&query).unwrap();
        let parsed: Query = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, query);
    }
}
