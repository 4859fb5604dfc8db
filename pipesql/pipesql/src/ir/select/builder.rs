use std::sync::Arc;

use enum_as_inner::EnumAsInner;
use pipesql_ast::ProjectionMember;
use serde::Serialize;

use super::{Ordering, ProjectionItem, ProjectionSlot, SelectExpr, TableSource};
use crate::ir::sx::SqlExpr;
use crate::utils::NameGenerator;

/// Alias of a table source created by pushing a select down into a subquery.
const SUBQUERY_ALIAS: &str = "t";

/// A `SELECT` under construction.
///
/// Pipeline operators mutate the builder in place. Its projection mapping
/// may still contain whole-entity placeholders; these are flattened into
/// scalar slots by [SelectBuilder::finalize].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SelectBuilder {
    tables: Vec<TableSource>,
    mapping: Vec<(ProjectionMember, ProjectionValue)>,
    predicate: Option<Arc<SqlExpr>>,
    orderings: Vec<Ordering>,
    limit: Option<Arc<SqlExpr>>,
    offset: Option<Arc<SqlExpr>>,
    is_distinct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, EnumAsInner)]
pub enum ProjectionValue {
    Sql(Arc<SqlExpr>),
    Entity(EntityProjection),
}

/// All columns of one entity, in property order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EntityProjection {
    pub entity: String,
    pub columns: Vec<(String, Arc<SqlExpr>)>,
}

impl EntityProjection {
    pub fn column(&self, property: &str) -> Option<&Arc<SqlExpr>> {
        self.columns
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, column)| column)
    }
}

impl SelectBuilder {
    /// Selects all columns of an entity from its table.
    pub fn new(table: TableSource, entity: EntityProjection) -> Self {
        SelectBuilder {
            tables: vec![table],
            mapping: vec![(ProjectionMember::root(), ProjectionValue::Entity(entity))],
            ..Default::default()
        }
    }

    /// A select without any table, projecting a single value.
    pub fn from_projection(expr: Arc<SqlExpr>) -> Self {
        SelectBuilder {
            mapping: vec![(ProjectionMember::root(), ProjectionValue::Sql(expr))],
            ..Default::default()
        }
    }

    pub fn tables(&self) -> &[TableSource] {
        &self.tables
    }

    pub fn mapping(&self) -> &[(ProjectionMember, ProjectionValue)] {
        &self.mapping
    }

    pub fn predicate(&self) -> Option<&Arc<SqlExpr>> {
        self.predicate.as_ref()
    }

    pub fn orderings(&self) -> &[Ordering] {
        &self.orderings
    }

    pub fn limit(&self) -> Option<&Arc<SqlExpr>> {
        self.limit.as_ref()
    }

    pub fn offset(&self) -> Option<&Arc<SqlExpr>> {
        self.offset.as_ref()
    }

    pub fn is_distinct(&self) -> bool {
        self.is_distinct
    }

    /// True when a limit or an offset was applied.
    pub fn is_limited(&self) -> bool {
        self.limit.is_some() || self.offset.is_some()
    }

    pub fn get_projection(&self, member: &ProjectionMember) -> Option<&ProjectionValue> {
        self.mapping
            .iter()
            .find(|(m, _)| m == member)
            .map(|(_, value)| value)
    }

    /// The scalar projected under a path.
    pub fn get_projection_expression(&self, member: &ProjectionMember) -> Option<Arc<SqlExpr>> {
        match self.get_projection(member)? {
            ProjectionValue::Sql(expr) => Some(Arc::clone(expr)),
            ProjectionValue::Entity(_) => None,
        }
    }

    /// Column of a property of the entity projected under a path.
    pub fn bind_property(&self, member: &ProjectionMember, property: &str) -> Option<Arc<SqlExpr>> {
        match self.get_projection(member)? {
            ProjectionValue::Entity(entity) => entity.column(property).cloned(),
            ProjectionValue::Sql(_) => None,
        }
    }

    /// Replaces the projection mapping wholesale.
    pub fn replace_projection(&mut self, mapping: Vec<(ProjectionMember, ProjectionValue)>) {
        self.mapping = mapping;
    }

    /// Projects nothing, so that the select renders as `SELECT 1`.
    pub fn clear_projection(&mut self) {
        self.mapping.clear();
    }

    /// ANDs a condition into the predicate. A constant `true` is ignored.
    pub fn apply_predicate(&mut self, expr: Arc<SqlExpr>) {
        if expr.is_true_constant() {
            return;
        }
        let expr = expr.to_value(false);

        self.predicate = Some(match self.predicate.take() {
            Some(existing) => Arc::new(SqlExpr::and(existing, expr)),
            None => expr,
        });
    }

    /// Replaces any existing ordering.
    pub fn apply_order_by(&mut self, ordering: Ordering) {
        self.orderings.clear();
        self.orderings.push(ordering);
    }

    /// Appends an ordering, unless its key is already ordered by.
    pub fn apply_then_by(&mut self, ordering: Ordering) {
        if self.orderings.iter().any(|o| o.expr == ordering.expr) {
            return;
        }
        self.orderings.push(ordering);
    }

    pub fn reverse_orderings(&mut self) {
        for ordering in &mut self.orderings {
            ordering.ascending = !ordering.ascending;
        }
    }

    pub fn clear_ordering(&mut self) {
        self.orderings.clear();
    }

    pub fn apply_limit(&mut self, limit: Arc<SqlExpr>) {
        self.limit = Some(limit);
    }

    pub fn apply_offset(&mut self, offset: Arc<SqlExpr>) {
        self.offset = Some(offset);
    }

    pub fn apply_distinct(&mut self) {
        self.is_distinct = true;
        self.orderings.clear();
    }

    /// Moves the whole select into a subquery of a new, empty select.
    ///
    /// The projection mapping of the new select refers to the columns of the
    /// subquery. Orderings are lifted to the outer select; the subquery keeps
    /// them only if it is paged.
    pub fn push_down_into_subquery(&mut self) {
        let inner = std::mem::take(self);
        let keep_orderings = inner.is_limited();

        let mut projection = ProjectionList::aliased();
        let (inner_mapping, slots) = projection.add_mapping(&inner.mapping);
        let ordering_slots: Vec<_> = inner
            .orderings
            .iter()
            .map(|o| projection.add(&o.expr, "c"))
            .collect();

        let items = projection.items;
        let outer_column = |slot: usize| {
            let item = &items[slot];
            let name = item.alias.as_deref().unwrap_or_default();
            Arc::new(SqlExpr::column(
                SUBQUERY_ALIAS,
                name,
                item.expr.ty.clone(),
                item.expr.type_mapping.clone(),
            ))
        };

        let mapping = inner
            .mapping
            .iter()
            .zip(&slots)
            .map(|((member, value), slot)| {
                let value = match slot {
                    ProjectionSlot::Scalar(slot) => ProjectionValue::Sql(outer_column(*slot)),
                    ProjectionSlot::Entity(columns) => ProjectionValue::Entity(EntityProjection {
                        entity: value
                            .as_entity()
                            .map(|e| e.entity.clone())
                            .unwrap_or_default(),
                        columns: columns
                            .iter()
                            .map(|(property, slot)| (property.clone(), outer_column(*slot)))
                            .collect(),
                    }),
                };
                (member.clone(), value)
            })
            .collect();
        let orderings = inner
            .orderings
            .iter()
            .zip(ordering_slots)
            .map(|(o, slot)| Ordering::new(outer_column(slot), o.ascending))
            .collect();

        let subquery = SelectExpr {
            tables: inner.tables,
            projection: items.clone(),
            projection_mapping: inner_mapping,
            predicate: inner.predicate,
            orderings: if keep_orderings {
                inner.orderings
            } else {
                Vec::new()
            },
            limit: inner.limit,
            offset: inner.offset,
            is_distinct: inner.is_distinct,
        };

        *self = SelectBuilder {
            tables: vec![TableSource::Subquery {
                select: Arc::new(subquery),
                alias: SUBQUERY_ALIAS.to_string(),
            }],
            mapping,
            orderings,
            ..Default::default()
        };
    }

    /// Flattens the projection mapping into slots and freezes the select.
    pub fn finalize(self) -> SelectExpr {
        let mut projection = ProjectionList::default();
        let (projection_mapping, _) = projection.add_mapping(&self.mapping);

        SelectExpr {
            tables: self.tables,
            projection: projection.items,
            projection_mapping,
            predicate: self.predicate,
            orderings: self.orderings,
            limit: self.limit,
            offset: self.offset,
            is_distinct: self.is_distinct,
        }
    }
}

/// Flat projection being assembled. Equal expressions share a slot.
#[derive(Default)]
struct ProjectionList {
    items: Vec<ProjectionItem>,
    /// Present when projected columns need names.
    names: Option<NameGenerator>,
}

impl ProjectionList {
    fn aliased() -> Self {
        ProjectionList {
            items: Vec::new(),
            names: Some(NameGenerator::new()),
        }
    }

    fn add(&mut self, expr: &Arc<SqlExpr>, preferred_alias: &str) -> usize {
        let expr = expr.to_value(true);
        if let Some(slot) = self.items.iter().position(|item| item.expr == expr) {
            return slot;
        }

        let alias = self.names.as_mut().map(|names| {
            let preferred = expr.preferred_alias().unwrap_or(preferred_alias);
            names.gen(preferred)
        });
        self.items.push(ProjectionItem { expr, alias });
        self.items.len() - 1
    }

    fn add_mapping(
        &mut self,
        mapping: &[(ProjectionMember, ProjectionValue)],
    ) -> (
        Vec<(ProjectionMember, ProjectionSlot)>,
        Vec<ProjectionSlot>,
    ) {
        let slots: Vec<_> = mapping
            .iter()
            .map(|(member, value)| match value {
                ProjectionValue::Sql(expr) => {
                    ProjectionSlot::Scalar(self.add(expr, member.last().unwrap_or("c")))
                }
                ProjectionValue::Entity(entity) => ProjectionSlot::Entity(
                    entity
                        .columns
                        .iter()
                        .map(|(property, column)| (property.clone(), self.add(column, property)))
                        .collect(),
                ),
            })
            .collect();

        let by_member = mapping
            .iter()
            .map(|(member, _)| member.clone())
            .zip(slots.iter().cloned())
            .collect();
        (by_member, slots)
    }
}

#[cfg(test)]
mod test {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    use insta::assert_debug_snapshot;
    use pipesql_ast::{Literal, Ty};

    use super::*;
    use crate::ir::sx::{SqlBinOp, SqlExprKind};

    fn column(name: &str) -> Arc<SqlExpr> {
        Arc::new(SqlExpr::column("p", name, Ty::int32(), None))
    }

    fn constant(value: i64) -> Arc<SqlExpr> {
        Arc::new(SqlExpr::new(
            SqlExprKind::Constant(Literal::Integer(value)),
            Ty::int32(),
            None,
        ))
    }

    fn gt(name: &str, value: i64) -> Arc<SqlExpr> {
        Arc::new(SqlExpr::binary(
            SqlBinOp::GreaterThan,
            column(name),
            constant(value),
            Ty::bool(),
            None,
        ))
    }

    fn person() -> SelectBuilder {
        let table = TableSource::Table {
            name: "Person".into(),
            schema: None,
            alias: "p".into(),
        };
        let entity = EntityProjection {
            entity: "Person".into(),
            columns: vec![("Age".into(), column("Age")), ("Name".into(), column("Name"))],
        };
        SelectBuilder::new(table, entity)
    }

    fn hash(select: &SelectBuilder) -> u64 {
        let mut hasher = DefaultHasher::new();
        select.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn structural_equality() {
        let mut a = person();
        let mut b = person();
        a.apply_predicate(gt("Age", 18));
        b.apply_predicate(gt("Age", 18));
        assert_eq!(a, b);
        assert_eq!(hash(&a), hash(&b));

        b.apply_limit(constant(1));
        assert_ne!(a, b);

        let mut c = a.clone();
        c.apply_distinct();
        assert_ne!(a, c);
    }

    #[test]
    fn conjunctive_predicates() {
        let mut select = person();
        select.apply_predicate(gt("Age", 18));
        select.apply_predicate(gt("Height", 150));

        let predicate = select.predicate().unwrap();
        let (op, left, right) = predicate.kind.as_binary().unwrap();
        assert_eq!(*op, SqlBinOp::AndAlso);
        assert_eq!(left, &gt("Age", 18));
        assert_eq!(right, &gt("Height", 150));

        let before = select.clone();
        select.apply_predicate(Arc::new(SqlExpr::new(
            SqlExprKind::Constant(Literal::Boolean(true)),
            Ty::bool(),
            None,
        )));
        assert_eq!(select, before);
    }

    #[test]
    fn ordering_replace_and_append() {
        let mut select = person();
        select.apply_order_by(Ordering::new(column("Age"), true));
        select.apply_order_by(Ordering::new(column("Name"), true));
        assert_eq!(select.orderings(), [Ordering::new(column("Name"), true)]);

        select.apply_then_by(Ordering::new(column("Age"), false));
        select.apply_then_by(Ordering::new(column("Name"), false));
        assert_eq!(
            select.orderings(),
            [
                Ordering::new(column("Name"), true),
                Ordering::new(column("Age"), false)
            ]
        );

        select.reverse_orderings();
        assert_eq!(
            select.orderings(),
            [
                Ordering::new(column("Name"), false),
                Ordering::new(column("Age"), true)
            ]
        );
    }

    #[test]
    fn distinct_clears_ordering() {
        let mut select = person();
        select.apply_order_by(Ordering::new(column("Age"), true));
        select.apply_distinct();
        assert!(select.is_distinct());
        assert!(select.orderings().is_empty());
    }

    #[test]
    fn finalize_assigns_slots() {
        let mut select = person();
        select.replace_projection(vec![
            (
                ProjectionMember::from_path(["A"]),
                ProjectionValue::Sql(column("Age")),
            ),
            (
                ProjectionMember::from_path(["B", "C"]),
                ProjectionValue::Sql(gt("Age", 18)),
            ),
            (
                ProjectionMember::from_path(["D"]),
                ProjectionValue::Sql(column("Age")),
            ),
        ]);
        let select = select.finalize();

        assert_eq!(select.projection.len(), 2);
        // projected conditions are rendered as values
        assert!(select.projection[1].expr.as_value);
        assert_debug_snapshot!(select.projection_mapping, @r"
        [
            (
                [A],
                Scalar(
                    0,
                ),
            ),
            (
                [B.C],
                Scalar(
                    1,
                ),
            ),
            (
                [D],
                Scalar(
                    0,
                ),
            ),
        ]
        ");
    }

    #[test]
    fn push_down() {
        let mut select = person();
        select.apply_order_by(Ordering::new(column("Age"), true));
        select.apply_limit(constant(5));
        select.push_down_into_subquery();

        let (inner, alias) = select.tables()[0].as_subquery().unwrap();
        assert_eq!(alias, "t");
        assert_eq!(inner.orderings.len(), 1);
        assert_eq!(inner.limit, Some(constant(5)));
        let aliases: Vec<_> = inner.projection.iter().map(|i| i.alias.clone()).collect();
        assert_eq!(aliases, [Some("Age".to_string()), Some("Name".to_string())]);

        assert!(!select.is_limited());
        let name = select
            .bind_property(&ProjectionMember::root(), "Name")
            .unwrap();
        assert_eq!(
            name.kind,
            SqlExprKind::Column {
                table: "t".into(),
                name: "Name".into()
            }
        );
        let ordering = &select.orderings()[0];
        assert_eq!(
            ordering.expr.kind,
            SqlExprKind::Column {
                table: "t".into(),
                name: "Age".into()
            }
        );
    }

    #[test]
    fn push_down_drops_unpaged_orderings() {
        let mut select = person();
        select.apply_order_by(Ordering::new(column("Age"), false));
        select.push_down_into_subquery();

        let (inner, _) = select.tables()[0].as_subquery().unwrap();
        assert!(inner.orderings.is_empty());
        assert_eq!(select.orderings().len(), 1);
        assert!(!select.orderings()[0].ascending);
    }
}
