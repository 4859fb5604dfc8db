use pipesql::model::{EntityType, Model, Property};
use pipesql::{Ty, TyKind};

mod concurrency;
mod errors;
mod shaper;
mod sql;

/// People with a name, an age, an activity flag and a nickname, stored in
/// table `Person`.
pub(crate) fn model() -> Model {
    Model::new().with_entity(
        EntityType::new("Person")
            .property("Name", Ty::text())
            .property("Age", Ty::int32())
            .property("Active", Ty::bool())
            .with_property(
                Property::new("Nickname", Ty::nullable(TyKind::Text))
                    .with_column("nick_name")
                    .with_store_type("nvarchar(50)"),
            ),
    )
}
