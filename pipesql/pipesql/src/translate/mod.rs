//! Translation of pipelines into shaped queries.
//!
//! [QueryTranslator] walks the operators of a [Query] and applies each to a
//! [SelectBuilder]. Lambdas are translated by inlining the current shaper
//! for their parameter and translating the body with a [SqlTranslator].
//! Whenever an operator can't be combined with the select as it stands
//! (i.e. filtering after a `Take`), the select is pushed down into a
//! subquery first.

mod factory;
mod projection;
mod sql_translator;

use std::sync::Arc;

use log::debug;
use pipesql_ast::fold::inline_lambda;
use pipesql_ast::{Expr, Lambda, Operator, ProjectionMember, Query, Ty, TyKind, WithErrorInfo};
use serde::Serialize;

pub use factory::SqlExprFactory;
pub use sql_translator::SqlTranslator;

use self::projection::ProjectionBinder;
use crate::functions::FunctionRegistry;
use crate::ir::select::{
    EntityProjection, Ordering, ProjectionValue, SelectBuilder, SelectExpr, TableSource,
};
use crate::ir::sx::SqlExpr;
use crate::model::{EntityType, Model};
use crate::sql::DialectHandler;
use crate::{Error, Result};

/// How many rows the caller expects from a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResultCardinality {
    Sequence,
    /// Exactly one row. Zero rows are an error.
    Single,
    /// Zero or one row. Zero rows produce the default value.
    SingleOrDefault,
}

/// A translated query: the select to run, and how to build results out of
/// its rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapedQuery {
    pub select: SelectExpr,
    pub shaper: Expr,
    pub cardinality: ResultCardinality,
}

/// A shaped query in the middle of translation.
#[derive(Debug, Clone)]
struct ShapedQueryBuilder {
    select: SelectBuilder,
    shaper: Expr,
    cardinality: ResultCardinality,
}

impl ShapedQueryBuilder {
    fn finalize(self) -> ShapedQuery {
        ShapedQuery {
            select: self.select.finalize(),
            shaper: self.shaper,
            cardinality: self.cardinality,
        }
    }

    /// Replaces the projection with a single scalar, read back as a single
    /// value.
    fn project_scalar(&mut self, expr: Arc<SqlExpr>, cardinality: ResultCardinality) {
        let member = ProjectionMember::root();
        self.shaper = Expr::ProjectionBinding {
            member: member.clone(),
            ty: expr.ty.clone(),
        };
        self.select
            .replace_projection(vec![(member, ProjectionValue::Sql(expr))]);
        self.cardinality = cardinality;
    }
}

pub struct QueryTranslator<'a> {
    model: &'a Model,
    factory: &'a SqlExprFactory,
    functions: &'a FunctionRegistry,
    dialect: &'a dyn DialectHandler,
}

impl<'a> QueryTranslator<'a> {
    pub fn new(
        model: &'a Model,
        factory: &'a SqlExprFactory,
        functions: &'a FunctionRegistry,
        dialect: &'a dyn DialectHandler,
    ) -> Self {
        QueryTranslator {
            model,
            factory,
            functions,
            dialect,
        }
    }

    pub fn translate(&self, query: &Query) -> Result<ShapedQuery> {
        let mut shaped = self.translate_source(&query.source)?;

        for operator in &query.operators {
            if shaped.cardinality != ResultCardinality::Sequence {
                return Err(Error::new_simple(format!(
                    "`{}` cannot follow an operator that returns a single value",
                    operator.name()
                )));
            }
            debug!("translating {}", operator.name());
            self.apply(&mut shaped, operator)?;
        }

        Ok(shaped.finalize())
    }

    fn translate_source(&self, name: &str) -> Result<ShapedQueryBuilder> {
        let Some(entity) = self.model.find_entity(name) else {
            return Err(Error::new(pipesql_ast::Reason::NotFound {
                name: name.to_string(),
                namespace: "entity".to_string(),
            }));
        };

        let table = entity.table_name();
        let alias = table_alias(table);
        let select = SelectBuilder::new(
            TableSource::Table {
                name: table.to_string(),
                schema: entity.schema.clone(),
                alias: alias.clone(),
            },
            self.entity_projection(entity, &alias),
        );

        Ok(ShapedQueryBuilder {
            select,
            shaper: Expr::EntityShaper {
                entity: entity.name.clone(),
                member: ProjectionMember::root(),
            },
            cardinality: ResultCardinality::Sequence,
        })
    }

    fn entity_projection(&self, entity: &EntityType, alias: &str) -> EntityProjection {
        let columns = entity
            .properties
            .iter()
            .map(|property| {
                let mapping = self.factory.find_mapping(&property.ty.kind);
                let mapping = match &property.store_type {
                    Some(store_type) => mapping.map(|m| m.with_store_type(store_type)),
                    None => mapping,
                };
                let column =
                    SqlExpr::column(alias, property.column_name(), property.ty.clone(), mapping);
                (property.name.clone(), Arc::new(column))
            })
            .collect();

        EntityProjection {
            entity: entity.name.clone(),
            columns,
        }
    }

    fn apply(&self, shaped: &mut ShapedQueryBuilder, operator: &Operator) -> Result<()> {
        match operator {
            Operator::Where(predicate) => self.apply_where(shaped, predicate)?,
            Operator::Select(selector) => self.apply_select(shaped, selector)?,

            Operator::OrderBy { key, descending } | Operator::ThenBy { key, descending } => {
                if shaped.select.is_limited() || shaped.select.is_distinct() {
                    shaped.select.push_down_into_subquery();
                }
                let key = self.translate_lambda(shaped, key, "ordering key")?;
                let ordering = Ordering::new(key, !descending);
                if matches!(operator, Operator::OrderBy { .. }) {
                    shaped.select.apply_order_by(ordering);
                } else {
                    shaped.select.apply_then_by(ordering);
                }
            }

            Operator::Skip(count) => {
                // an offset on a distinct select needs an ordering over its own columns
                if shaped.select.is_limited() || shaped.select.is_distinct() {
                    shaped.select.push_down_into_subquery();
                }
                let count = self.translate_count(shaped, count)?;
                shaped.select.apply_offset(count);
            }
            Operator::Take(count) => {
                if shaped.select.limit().is_some() {
                    shaped.select.push_down_into_subquery();
                }
                let count = self.translate_count(shaped, count)?;
                shaped.select.apply_limit(count);
            }
            Operator::Distinct => {
                if shaped.select.is_limited() {
                    shaped.select.push_down_into_subquery();
                }
                shaped.select.apply_distinct();
            }

            Operator::Any(predicate) => {
                if let Some(predicate) = predicate {
                    self.apply_where(shaped, predicate)?;
                }
                self.apply_exists(shaped, false);
            }
            Operator::All(predicate) => {
                if shaped.select.is_limited() || shaped.select.is_distinct() {
                    shaped.select.push_down_into_subquery();
                }
                let predicate = self.translate_predicate(shaped, predicate)?;
                let predicate = self.factory.not(&predicate)?;
                shaped.select.apply_predicate(predicate);
                self.apply_exists(shaped, true);
            }

            Operator::Count(predicate) | Operator::LongCount(predicate) => {
                if let Some(predicate) = predicate {
                    self.apply_where(shaped, predicate)?;
                }
                let long = matches!(operator, Operator::LongCount(_));
                self.apply_count(shaped, long)?;
            }

            Operator::Sum(selector)
            | Operator::Average(selector)
            | Operator::Min(selector)
            | Operator::Max(selector) => self.apply_aggregate(shaped, operator, selector)?,

            Operator::First {
                predicate,
                or_default,
            }
            | Operator::Single {
                predicate,
                or_default,
            } => {
                if let Some(predicate) = predicate {
                    self.apply_where(shaped, predicate)?;
                }
                if shaped.select.limit().is_some() {
                    shaped.select.push_down_into_subquery();
                }
                shaped.select.apply_limit(self.factory.int(1));
                shaped.cardinality = single(*or_default);
            }
            Operator::Last {
                predicate,
                or_default,
            } => {
                if let Some(predicate) = predicate {
                    self.apply_where(shaped, predicate)?;
                }
                if shaped.select.is_limited() {
                    shaped.select.push_down_into_subquery();
                }
                if shaped.select.orderings().is_empty() {
                    return Err(Error::new_simple(format!(
                        "`{}` requires an ordered sequence",
                        operator.name()
                    ))
                    .push_hint("add an `OrderBy` before it"));
                }
                shaped.select.reverse_orderings();
                shaped.select.apply_limit(self.factory.int(1));
                shaped.cardinality = single(*or_default);
            }

            Operator::Reverse
            | Operator::ElementAt { .. }
            | Operator::Cast(_)
            | Operator::OfType(_)
            | Operator::Contains(_)
            | Operator::DefaultIfEmpty(_)
            | Operator::Concat(_)
            | Operator::Union(_)
            | Operator::Intersect(_)
            | Operator::Except(_)
            | Operator::Zip(_)
            | Operator::GroupBy { .. }
            | Operator::Join { .. }
            | Operator::GroupJoin { .. }
            | Operator::SelectMany(_)
            | Operator::SkipWhile(_)
            | Operator::TakeWhile(_) => return Err(Error::new_unsupported(operator.name())),
        }
        Ok(())
    }

    fn apply_where(&self, shaped: &mut ShapedQueryBuilder, predicate: &Lambda) -> Result<()> {
        if shaped.select.is_limited() || shaped.select.is_distinct() {
            shaped.select.push_down_into_subquery();
        }
        let predicate = self.translate_predicate(shaped, predicate)?;
        shaped.select.apply_predicate(predicate);
        Ok(())
    }

    fn apply_select(&self, shaped: &mut ShapedQueryBuilder, selector: &Lambda) -> Result<()> {
        if selector.is_identity() {
            return Ok(());
        }
        if shaped.select.is_distinct() {
            shaped.select.push_down_into_subquery();
        }

        let body = inline_lambda(selector, &shaped.shaper)?;
        let translator = self.sql_translator(&shaped.select);
        let (shaper, mapping) = ProjectionBinder::new(translator, &shaped.select).bind(&body)?;

        shaped.select.replace_projection(mapping);
        shaped.shaper = shaper;
        Ok(())
    }

    /// Replaces the query with `SELECT EXISTS (..)`.
    fn apply_exists(&self, shaped: &mut ShapedQueryBuilder, negated: bool) {
        let mut select = std::mem::take(&mut shaped.select);
        select.clear_projection();
        if !select.is_limited() {
            select.clear_ordering();
        }

        let exists = self.factory.exists(select.finalize(), negated).to_value(true);
        shaped.shaper = Expr::ProjectionBinding {
            member: ProjectionMember::root(),
            ty: exists.ty.clone(),
        };
        shaped.select = SelectBuilder::from_projection(exists);
        shaped.cardinality = ResultCardinality::Single;
    }

    fn apply_count(&self, shaped: &mut ShapedQueryBuilder, long: bool) -> Result<()> {
        if shaped.select.is_limited() || shaped.select.is_distinct() {
            shaped.select.push_down_into_subquery();
        }
        shaped.select.clear_ordering();

        let (function, ty) = if long {
            (self.dialect.long_count_function(), Ty::int64())
        } else {
            ("COUNT", Ty::int32())
        };
        let star = self.factory.fragment("*", ty.clone());
        let count = self.factory.function(function, vec![star], ty)?;

        shaped.project_scalar(count, ResultCardinality::Single);
        Ok(())
    }

    fn apply_aggregate(
        &self,
        shaped: &mut ShapedQueryBuilder,
        operator: &Operator,
        selector: &Option<Lambda>,
    ) -> Result<()> {
        if shaped.select.is_limited() || shaped.select.is_distinct() {
            shaped.select.push_down_into_subquery();
        }
        if let Some(selector) = selector {
            self.apply_select(shaped, selector)?;
        }
        shaped.select.clear_ordering();

        let Some(input) = shaped
            .select
            .get_projection_expression(&ProjectionMember::root())
        else {
            return Err(Error::new_untranslatable(operator.name(), &shaped.shaper)
                .push_hint("select a single scalar value before aggregating"));
        };
        let input = self.factory.apply_default_type_mapping(&input)?;
        let kind = &input.ty.kind;
        let nullable = input.ty.nullable;

        let aggregate = match operator {
            Operator::Sum(_) if *kind == TyKind::Float32 => {
                self.float32_aggregate("SUM", &input)?
            }
            Operator::Sum(_) => self.factory.function("SUM", vec![input.clone()], input.ty.clone())?,

            Operator::Average(_) if *kind == TyKind::Float32 => {
                self.float32_aggregate("AVG", &input)?
            }
            Operator::Average(_) if kind.is_integer() => {
                let ty = Ty::float64().with_nullable(nullable);
                let value = self.cast(&input, ty.clone())?;
                self.factory.function("AVG", vec![value], ty)?
            }
            Operator::Average(_) => {
                self.factory.function("AVG", vec![input.clone()], input.ty.clone())?
            }

            Operator::Min(_) => self.factory.function("MIN", vec![input.clone()], input.ty.clone())?,
            _ => self.factory.function("MAX", vec![input.clone()], input.ty.clone())?,
        };

        shaped.project_scalar(aggregate, ResultCardinality::Single);

        // an empty input has no average, minimum or maximum
        let ensure_non_empty = !nullable && !matches!(operator, Operator::Sum(_));
        if ensure_non_empty {
            shaped.shaper = Expr::EnsureNonEmpty(Box::new(shaped.shaper.clone()));
        }
        Ok(())
    }

    /// Computes an aggregate of single-precision floats in double precision
    /// and casts the result back.
    fn float32_aggregate(&self, function: &str, input: &Arc<SqlExpr>) -> Result<Arc<SqlExpr>> {
        let nullable = input.ty.nullable;
        let double = Ty::float64().with_nullable(nullable);
        let value = self.cast(input, double.clone())?;
        let aggregate = self.factory.function(function, vec![value], double)?;
        self.cast(&aggregate, input.ty.clone())
    }

    fn cast(&self, expr: &Arc<SqlExpr>, ty: Ty) -> Result<Arc<SqlExpr>> {
        let kind = ty.kind.clone();
        self.factory
            .cast(expr, ty)?
            .ok_or_else(|| Error::new_assert(format!("no store type to cast to {kind:?}")))
    }

    fn translate_predicate(
        &self,
        shaped: &ShapedQueryBuilder,
        predicate: &Lambda,
    ) -> Result<Arc<SqlExpr>> {
        let body = inline_lambda(predicate, &shaped.shaper)?;
        self.sql_translator(&shaped.select)
            .translate_condition(&body)?
            .ok_or_else(|| Error::new_untranslatable("predicate", &predicate.body))
    }

    fn translate_lambda(
        &self,
        shaped: &ShapedQueryBuilder,
        lambda: &Lambda,
        what: &str,
    ) -> Result<Arc<SqlExpr>> {
        let body = inline_lambda(lambda, &shaped.shaper)?;
        self.sql_translator(&shaped.select)
            .translate(&body)?
            .ok_or_else(|| Error::new_untranslatable(what, &lambda.body))
    }

    fn translate_count(&self, shaped: &ShapedQueryBuilder, count: &Expr) -> Result<Arc<SqlExpr>> {
        self.sql_translator(&shaped.select)
            .translate(count)?
            .ok_or_else(|| Error::new_untranslatable("row count", count))
    }

    fn sql_translator<'s>(&'s self, select: &'s SelectBuilder) -> SqlTranslator<'s> {
        SqlTranslator::new(self.factory, self.functions, select)
    }
}

fn single(or_default: bool) -> ResultCardinality {
    if or_default {
        ResultCardinality::SingleOrDefault
    } else {
        ResultCardinality::Single
    }
}

/// Alias of a table: the lowercase first character of its name.
fn table_alias(table: &str) -> String {
    match table.chars().find(|c| c.is_alphabetic()) {
        Some(c) => c.to_lowercase().collect(),
        None => "t".to_string(),
    }
}

/// Resolves members of structural constructors, so `new { A = x }.A`
/// becomes `x`.
pub(crate) fn reduce_member_access(expr: &Expr) -> &Expr {
    if let Expr::Member {
        instance: Some(instance),
        member,
    } = expr
    {
        if let Expr::New(members) = reduce_member_access(instance) {
            let selected = members
                .iter()
                .find(|m| m.name.as_deref() == Some(member.name.as_str()));
            if let Some(selected) = selected {
                return reduce_member_access(&selected.expr);
            }
        }
    }
    expr
}
