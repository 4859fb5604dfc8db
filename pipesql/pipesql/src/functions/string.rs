use std::sync::Arc;

use pipesql_ast::{Ident, Literal, Ty};

use super::FunctionTranslator;
use crate::ir::sx::{SqlBinOp, SqlExpr, SqlExprKind};
use crate::translate::SqlExprFactory;
use crate::Result;

const LIKE_ESCAPE: char = '\\';

/// String operations that translate the same way in most dialects.
#[derive(Debug)]
pub struct StringTranslator {
    /// Function returning the number of characters of a string.
    length_function: &'static str,
}

impl StringTranslator {
    pub fn new(length_function: &'static str) -> Self {
        StringTranslator { length_function }
    }
}

impl FunctionTranslator for StringTranslator {
    fn translate_method(
        &self,
        factory: &SqlExprFactory,
        instance: Option<&Arc<SqlExpr>>,
        method: &Ident,
        args: &[Arc<SqlExpr>],
    ) -> Result<Option<Arc<SqlExpr>>> {
        let Some(instance) = instance.filter(|_| method.owner() == Some("string")) else {
            return Ok(None);
        };

        Ok(Some(match (method.name.as_str(), args) {
            ("to_lower", []) => same_type_function(factory, "LOWER", vec![Arc::clone(instance)])?,
            ("to_upper", []) => same_type_function(factory, "UPPER", vec![Arc::clone(instance)])?,
            ("replace", [from, to]) => {
                let args = factory.apply_common_type_mapping(&[instance, from, to])?;
                same_type_function(factory, "REPLACE", args)?
            }
            ("starts_with", [pattern]) => {
                return constant_like(factory, instance, pattern, LikePosition::Start)
            }
            ("ends_with", [pattern]) => {
                return constant_like(factory, instance, pattern, LikePosition::End)
            }
            ("contains", [pattern]) => {
                return constant_like(factory, instance, pattern, LikePosition::Anywhere)
            }
            _ => return Ok(None),
        }))
    }

    fn translate_member(
        &self,
        factory: &SqlExprFactory,
        instance: Option<&Arc<SqlExpr>>,
        member: &Ident,
    ) -> Result<Option<Arc<SqlExpr>>> {
        match instance {
            Some(instance) if member.is("string", "length") => {
                let ty = Ty::int32().with_nullable(instance.ty.nullable);
                factory
                    .function(self.length_function, vec![Arc::clone(instance)], ty)
                    .map(Some)
            }
            _ => Ok(None),
        }
    }
}

/// String operations of SQLite.
#[derive(Debug)]
pub struct SqliteStringTranslator;

impl FunctionTranslator for SqliteStringTranslator {
    fn translate_method(
        &self,
        factory: &SqlExprFactory,
        instance: Option<&Arc<SqlExpr>>,
        method: &Ident,
        args: &[Arc<SqlExpr>],
    ) -> Result<Option<Arc<SqlExpr>>> {
        if method.owner() != Some("string") {
            return Ok(None);
        }
        let Some(instance) = instance else {
            return match (method.name.as_str(), args) {
                ("is_null_or_white_space", [arg]) => {
                    // arg IS NULL OR trim(arg) = ''
                    let trimmed = same_type_function(factory, "trim", vec![Arc::clone(arg)])?;
                    let is_empty = factory.equal(&trimmed, &text(factory, ""))?;
                    let is_null = factory.is_null(arg, false)?;
                    factory.or(&is_null, &is_empty).map(Some)
                }
                _ => Ok(None),
            };
        };

        Ok(Some(match (method.name.as_str(), args) {
            ("index_of", [arg]) => {
                let args = factory.apply_common_type_mapping(&[instance, arg])?;
                let instr = factory.function("instr", args, Ty::int32())?;
                factory.subtract(&instr, &factory.int(1))?
            }
            ("replace", [from, to]) => {
                let args = factory.apply_common_type_mapping(&[instance, from, to])?;
                same_type_function(factory, "replace", args)?
            }
            ("to_lower", []) => same_type_function(factory, "lower", vec![Arc::clone(instance)])?,
            ("to_upper", []) => same_type_function(factory, "upper", vec![Arc::clone(instance)])?,
            ("substring", [start, length]) => {
                let start = factory.add(start, &factory.int(1))?;
                same_type_function(
                    factory,
                    "substr",
                    vec![Arc::clone(instance), start, Arc::clone(length)],
                )?
            }
            ("trim_start", args) => return trim(factory, instance, args, "ltrim"),
            ("trim_end", args) => return trim(factory, instance, args, "rtrim"),
            ("trim", args) => return trim(factory, instance, args, "trim"),
            ("contains", [pattern]) => {
                // pattern = '' OR instr(instance, pattern) > 0
                let args = factory.apply_common_type_mapping(&[instance, pattern])?;
                let is_empty = factory.equal(&args[1], &text(factory, ""))?;
                let instr = factory.function("instr", args, Ty::int32())?;
                let found = factory.binary(SqlBinOp::GreaterThan, &instr, &factory.int(0))?;
                factory.or(&is_empty, &found)?
            }
            ("starts_with", [pattern]) => {
                // pattern = '' OR (instance LIKE pattern || '%'
                //     AND substr(instance, 1, length(pattern)) = pattern)
                let args = factory.apply_common_type_mapping(&[instance, pattern])?;
                let (instance, pattern) = (&args[0], &args[1]);
                let is_empty = factory.equal(pattern, &text(factory, ""))?;
                let like_pattern = factory.add(pattern, &text(factory, "%"))?;
                let like = factory.like(instance, &like_pattern, None)?;
                let length = factory.function("length", vec![Arc::clone(pattern)], Ty::int32())?;
                let prefix = same_type_function(
                    factory,
                    "substr",
                    vec![Arc::clone(instance), factory.int(1), length],
                )?;
                let prefix_matches = factory.equal(&prefix, pattern)?;
                let matches = factory.and(&like, &prefix_matches)?;
                factory.or(&is_empty, &matches)?
            }
            ("ends_with", [pattern]) => {
                // pattern = '' OR substr(instance, -length(pattern)) = pattern
                let args = factory.apply_common_type_mapping(&[instance, pattern])?;
                let (instance, pattern) = (&args[0], &args[1]);
                let is_empty = factory.equal(pattern, &text(factory, ""))?;
                let length = factory.function("length", vec![Arc::clone(pattern)], Ty::int32())?;
                let suffix = same_type_function(
                    factory,
                    "substr",
                    vec![Arc::clone(instance), factory.negate(&length)?],
                )?;
                let suffix_matches = factory.equal(&suffix, pattern)?;
                factory.or(&is_empty, &suffix_matches)?
            }
            _ => return Ok(None),
        }))
    }

    fn translate_member(
        &self,
        factory: &SqlExprFactory,
        instance: Option<&Arc<SqlExpr>>,
        member: &Ident,
    ) -> Result<Option<Arc<SqlExpr>>> {
        match instance {
            Some(instance) if member.is("string", "length") => {
                let ty = Ty::int32().with_nullable(instance.ty.nullable);
                factory
                    .function("length", vec![Arc::clone(instance)], ty)
                    .map(Some)
            }
            _ => Ok(None),
        }
    }
}

fn text(factory: &SqlExprFactory, value: &str) -> Arc<SqlExpr> {
    factory.constant(Literal::Text(value.to_string()), Ty::text())
}

/// A function returning a value of the same type as its first argument.
fn same_type_function(
    factory: &SqlExprFactory,
    name: &str,
    args: Vec<Arc<SqlExpr>>,
) -> Result<Arc<SqlExpr>> {
    let first = factory.apply_default_type_mapping(&args[0])?;
    let (ty, mapping) = (first.ty.clone(), first.type_mapping.clone());
    factory.function_with_mapping(name, None, args, ty, mapping)
}

/// `ltrim`, `rtrim` and `trim`, with an optional set of characters.
fn trim(
    factory: &SqlExprFactory,
    instance: &Arc<SqlExpr>,
    args: &[Arc<SqlExpr>],
    function: &str,
) -> Result<Option<Arc<SqlExpr>>> {
    if instance.type_mapping.is_none() {
        return Ok(None);
    }

    let mut sql_args = vec![Arc::clone(instance)];
    match args {
        [] => {}
        [chars] => {
            let chars: String = match &chars.kind {
                SqlExprKind::Constant(Literal::Char(c)) => c.to_string(),
                SqlExprKind::Constant(Literal::Array(items)) => {
                    let mut chars = String::new();
                    for item in items {
                        let Literal::Char(c) = item else {
                            return Ok(None);
                        };
                        chars.push(*c);
                    }
                    chars
                }
                _ => return Ok(None),
            };
            if !chars.is_empty() {
                let chars = text(factory, &chars);
                sql_args.push(factory.apply_type_mapping(&chars, instance.type_mapping.as_ref())?);
            }
        }
        _ => return Ok(None),
    }

    same_type_function(factory, function, sql_args).map(Some)
}

enum LikePosition {
    Start,
    End,
    Anywhere,
}

/// `instance LIKE 'pattern%'` for a constant pattern. Wildcards within the
/// pattern are escaped.
fn constant_like(
    factory: &SqlExprFactory,
    instance: &Arc<SqlExpr>,
    pattern: &Arc<SqlExpr>,
    position: LikePosition,
) -> Result<Option<Arc<SqlExpr>>> {
    let SqlExprKind::Constant(Literal::Text(value)) = &pattern.kind else {
        return Ok(None);
    };

    let mut escaped = String::with_capacity(value.len());
    let mut needs_escape = false;
    for c in value.chars() {
        if matches!(c, '%' | '_' | '[' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
            needs_escape = true;
        }
        escaped.push(c);
    }
    let like_pattern = match position {
        LikePosition::Start => format!("{escaped}%"),
        LikePosition::End => format!("%{escaped}"),
        LikePosition::Anywhere => format!("%{escaped}%"),
    };

    let escape = needs_escape.then(|| text(factory, &LIKE_ESCAPE.to_string()));
    factory
        .like(instance, &text(factory, &like_pattern), escape.as_ref())
        .map(Some)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sql::Dialect;
    use crate::types::DialectTypeMappings;

    fn setup(dialect: Dialect) -> (SqlExprFactory, Arc<SqlExpr>) {
        let factory = SqlExprFactory::new(Arc::new(DialectTypeMappings::new(dialect)));
        let mapping = factory.find_mapping(&pipesql_ast::TyKind::Text);
        let name = Arc::new(SqlExpr::column("p", "Name", Ty::text(), mapping));
        (factory, name)
    }

    #[test]
    fn like_escapes_wildcards() {
        let (factory, name) = setup(Dialect::Postgres);
        let like = StringTranslator::new("LENGTH")
            .translate_method(
                &factory,
                Some(&name),
                &Ident::new("string", "starts_with"),
                &[text(&factory, "50%")],
            )
            .unwrap()
            .unwrap();
        let (_, pattern, escape) = like.kind.as_like().unwrap();
        assert_eq!(pattern.kind, SqlExprKind::Constant(Literal::Text("50\\%%".into())));
        assert!(escape.is_some());
    }

    #[test]
    fn non_constant_like_is_not_handled() {
        let (factory, name) = setup(Dialect::MsSql);
        let res = StringTranslator::new("LEN")
            .translate_method(
                &factory,
                Some(&name),
                &Ident::new("string", "ends_with"),
                &[Arc::clone(&name)],
            )
            .unwrap();
        assert!(res.is_none());
    }

    #[test]
    fn sqlite_trim_chars() {
        let (factory, name) = setup(Dialect::SQLite);
        let chars = factory.constant(
            Literal::Array(vec![Literal::Char('x'), Literal::Char('y')]),
            Ty::text(),
        );
        let trimmed = SqliteStringTranslator
            .translate_method(&factory, Some(&name), &Ident::new("string", "trim_end"), &[chars])
            .unwrap()
            .unwrap();
        let (function, _, _, args) = trimmed.kind.as_function().unwrap();
        assert_eq!(function, "rtrim");
        assert_eq!(args[1].kind, SqlExprKind::Constant(Literal::Text("xy".into())));

        let not_constant = SqliteStringTranslator
            .translate_method(
                &factory,
                Some(&name),
                &Ident::new("string", "trim"),
                &[Arc::clone(&name)],
            )
            .unwrap();
        assert!(not_constant.is_none());
    }
}
