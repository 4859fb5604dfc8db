use pipesql_ast::{Expr, NewMember, ProjectionMember, WithErrorInfo};

use super::{reduce_member_access, SqlTranslator};
use crate::ir::select::{ProjectionValue, SelectBuilder};
use crate::{Error, Result};

/// Splits the body of a `Select` into a shaper and a projection mapping.
///
/// Every scalar leaf of the body is translated and moved into the mapping
/// under its member path, leaving a [Expr::ProjectionBinding] behind.
/// Entities are carried over whole. Structural constructors stay in the
/// shaper.
pub(super) struct ProjectionBinder<'a> {
    translator: SqlTranslator<'a>,
    select: &'a SelectBuilder,
    mapping: Vec<(ProjectionMember, ProjectionValue)>,
}

impl<'a> ProjectionBinder<'a> {
    pub fn new(translator: SqlTranslator<'a>, select: &'a SelectBuilder) -> Self {
        ProjectionBinder {
            translator,
            select,
            mapping: Vec::new(),
        }
    }

    pub fn bind(
        mut self,
        body: &Expr,
    ) -> Result<(Expr, Vec<(ProjectionMember, ProjectionValue)>)> {
        let shaper = self.visit(body, ProjectionMember::root())?;
        Ok((shaper, self.mapping))
    }

    fn visit(&mut self, expr: &Expr, member: ProjectionMember) -> Result<Expr> {
        let expr = reduce_member_access(expr);

        match expr {
            Expr::New(members) => {
                let mut bound = Vec::with_capacity(members.len());
                for m in members {
                    let Some(name) = &m.name else {
                        return Err(Error::new_untranslatable("projection", expr)
                            .push_hint("give every member of the shape a name"));
                    };
                    bound.push(NewMember {
                        name: Some(name.clone()),
                        expr: self.visit(&m.expr, member.append(name))?,
                    });
                }
                Ok(Expr::New(bound))
            }

            Expr::EntityShaper {
                entity,
                member: source,
            } => {
                let Some(ProjectionValue::Entity(projection)) = self.select.get_projection(source)
                else {
                    return Err(Error::new_assert(format!(
                        "no entity {entity} projected under {source}"
                    )));
                };
                self.mapping
                    .push((member.clone(), ProjectionValue::Entity(projection.clone())));
                Ok(Expr::EntityShaper {
                    entity: entity.clone(),
                    member,
                })
            }

            _ => {
                let Some(sql) = self.translator.translate(expr)? else {
                    return Err(Error::new_untranslatable("projection", expr));
                };
                let ty = sql.ty.clone();
                self.mapping.push((member.clone(), ProjectionValue::Sql(sql)));
                Ok(Expr::ProjectionBinding { member, ty })
            }
        }
    }
}
