//! Evaluation of shapers against result rows.
//!
//! A row is the list of values of the flat projection of a [ShapedQuery],
//! in slot order. The shaper says which slots make up which part of the
//! result.

use pipesql_ast::{codes, Expr, Literal, Ty, TyKind, WithErrorInfo};
use serde::Serialize;

use crate::ir::select::ProjectionSlot;
use crate::translate::{ResultCardinality, ShapedQuery};
use crate::{Error, Result};

/// A materialized result value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Value {
    Scalar(Literal),
    /// Named members, in declaration order.
    Object(Vec<(String, Value)>),
}

impl Value {
    pub fn as_scalar(&self) -> Option<&Literal> {
        match self {
            Value::Scalar(literal) => Some(literal),
            Value::Object(_) => None,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Object(members) => members.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            Value::Scalar(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum QueryResult {
    Sequence(Vec<Value>),
    Single(Value),
    SingleOrDefault(Option<Value>),
}

impl ShapedQuery {
    /// Builds result values out of the rows returned for this query.
    pub fn materialize(&self, rows: &[Vec<Literal>]) -> Result<QueryResult> {
        let values = || rows.iter().map(|row| self.shape(&self.shaper, row));

        Ok(match self.cardinality {
            ResultCardinality::Sequence => QueryResult::Sequence(values().collect::<Result<_>>()?),
            ResultCardinality::Single => match values().next() {
                Some(value) => QueryResult::Single(value?),
                None => return Err(no_elements()),
            },
            ResultCardinality::SingleOrDefault => {
                QueryResult::SingleOrDefault(values().next().transpose()?)
            }
        })
    }

    fn shape(&self, shaper: &Expr, row: &[Literal]) -> Result<Value> {
        Ok(match shaper {
            Expr::ProjectionBinding { member, ty } => {
                let slot = self.scalar_slot(member)?;
                Value::Scalar(coerce(read(row, slot)?, ty))
            }

            Expr::EntityShaper { entity, member } => {
                let Some(ProjectionSlot::Entity(columns)) = self.select.slot(member) else {
                    return Err(Error::new_assert(format!(
                        "no entity projection of {entity} at {member}"
                    )));
                };
                let properties = columns
                    .iter()
                    .map(|(property, slot)| -> Result<_> {
                        let ty = &self.select.projection[*slot].expr.ty;
                        Ok((property.clone(), Value::Scalar(coerce(read(row, *slot)?, ty))))
                    })
                    .collect::<Result<_>>()?;
                Value::Object(properties)
            }

            Expr::New(members) => {
                let members = members
                    .iter()
                    .enumerate()
                    .map(|(i, m)| -> Result<_> {
                        let Some(name) = &m.name else {
                            return Err(Error::new_assert(format!("member {i} of `{shaper}` has no name")));
                        };
                        Ok((name.clone(), self.shape(&m.expr, row)?))
                    })
                    .collect::<Result<_>>()?;
                Value::Object(members)
            }

            Expr::EnsureNonEmpty(inner) => {
                if let Expr::ProjectionBinding { member, .. } = inner.as_ref() {
                    if read(row, self.scalar_slot(member)?)?.is_null() {
                        return Err(no_elements());
                    }
                }
                self.shape(inner, row)?
            }

            Expr::Constant(literal) => Value::Scalar(literal.clone()),

            expr => {
                return Err(Error::new_assert(format!(
                    "`{expr}` is not a shaper expression"
                )))
            }
        })
    }

    fn scalar_slot(&self, member: &pipesql_ast::ProjectionMember) -> Result<usize> {
        match self.select.slot(member) {
            Some(ProjectionSlot::Scalar(slot)) => Ok(*slot),
            _ => Err(Error::new_assert(format!(
                "no scalar projection at {member}"
            ))),
        }
    }
}

fn read(row: &[Literal], slot: usize) -> Result<&Literal> {
    row.get(slot).ok_or_else(|| {
        Error::new_simple(format!(
            "result row has {} values, but slot {slot} was requested",
            row.len()
        ))
    })
}

/// Converts a database value into the shape of `ty`.
fn coerce(value: &Literal, ty: &Ty) -> Literal {
    match (value, &ty.kind) {
        (Literal::Null, _) => ty.default_value(),
        (Literal::Integer(i), TyKind::Bool) => Literal::Boolean(*i != 0),
        (Literal::Integer(i), kind) if kind.is_float() => Literal::Float(*i as f64),
        (value, _) => value.clone(),
    }
}

fn no_elements() -> Error {
    Error::new_simple("Sequence contains no elements").with_code(codes::NO_ELEMENTS)
}
