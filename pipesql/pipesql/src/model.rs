//! Entity metadata: which table and columns an entity type is stored in.

use pipesql_ast::Ty;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Model {
    #[serde(default)]
    pub entities: Vec<EntityType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityType {
    pub name: String,
    /// Defaults to the name of the entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub properties: Vec<Property>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    /// Defaults to the name of the property.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub ty: Ty,
    /// Overrides the store type of the catalog's mapping, i.e. `nvarchar(50)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_type: Option<String>,
}

impl Model {
    pub fn new() -> Self {
        Model::default()
    }

    pub fn with_entity(mut self, entity: EntityType) -> Self {
        self.entities.push(entity);
        self
    }

    pub fn find_entity(&self, name: &str) -> Option<&EntityType> {
        self.entities.iter().find(|e| e.name == name)
    }
}

impl EntityType {
    pub fn new<S: ToString>(name: S) -> Self {
        EntityType {
            name: name.to_string(),
            table: None,
            schema: None,
            properties: Vec::new(),
        }
    }

    pub fn with_table<S: ToString>(mut self, table: S, schema: Option<&str>) -> Self {
        self.table = Some(table.to_string());
        self.schema = schema.map(str::to_string);
        self
    }

    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    /// Shorthand for a property stored in a column of the same name.
    pub fn property<S: ToString>(self, name: S, ty: Ty) -> Self {
        self.with_property(Property::new(name, ty))
    }

    pub fn table_name(&self) -> &str {
        self.table.as_deref().unwrap_or(&self.name)
    }

    pub fn find_property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }
}

impl Property {
    pub fn new<S: ToString>(name: S, ty: Ty) -> Self {
        Property {
            name: name.to_string(),
            column: None,
            ty,
            store_type: None,
        }
    }

    pub fn with_column<S: ToString>(mut self, column: S) -> Self {
        self.column = Some(column.to_string());
        self
    }

    pub fn with_store_type<S: ToString>(mut self, store_type: S) -> Self {
        self.store_type = Some(store_type.to_string());
        self
    }

    pub fn column_name(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.name)
    }
}
