//! Keyed structural validation of objects.

use std::sync::Arc;

use crate::error::TypeError;
use crate::options::{Mode, ValidationOptions};
use crate::print::{default_object_rep, extension_name};
use crate::result::{create_result, prepend_path, DetailKind, MessageDetail, PathSegment, ValidationResult};
use crate::types::intersection::intersection;
use crate::types::{PossibleDiscriminator, Properties, PropertiesInfo, PropertyInfo, Shape, Type, TypeParts};
use crate::value::{BasicType, Object, Value};

#[derive(Clone, Debug)]
pub struct ObjectOptions {
    /// Custom name. Without one, a `{ key: type }` rendering is used.
    pub name: Option<String>,
    /// Every property is optional.
    pub partial: bool,
    /// Distinguish a missing key from a key holding `undefined`.
    pub strict_missing_keys: bool,
    /// Always validate this subtree in check mode, so nested parsers never
    /// run.
    pub check_only: bool,
    pub allow_unknown_properties: bool,
}

impl Default for ObjectOptions {
    fn default() -> Self {
        Self {
            name: None,
            partial: false,
            strict_missing_keys: false,
            check_only: false,
            allow_unknown_properties: true,
        }
    }
}

#[derive(Debug)]
pub struct ObjectShape {
    pub props: Properties,
    pub props_info: PropertiesInfo,
    pub options: ObjectOptions,
    pub discriminators: Vec<PossibleDiscriminator>,
}

// ------------------------------ Constructors ----------------------------- //

pub fn object<K, I>(props: I) -> Type
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Type)>,
{
    object_with(ObjectOptions::default(), props)
}

pub fn object_named<K, I>(name: impl Into<String>, props: I) -> Type
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Type)>,
{
    object_with(ObjectOptions { name: Some(name.into()), ..ObjectOptions::default() }, props)
}

pub fn object_with<K, I>(options: ObjectOptions, props: I) -> Type
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Type)>,
{
    build(props.into_iter().map(|(k, ty)| (k.into(), ty)).collect(), options)
}

/// An object type whose properties are all optional.
pub fn partial<K, I>(props: I) -> Type
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Type)>,
{
    partial_with(ObjectOptions::default(), props)
}

pub fn partial_named<K, I>(name: impl Into<String>, props: I) -> Type
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Type)>,
{
    partial_with(ObjectOptions { name: Some(name.into()), ..ObjectOptions::default() }, props)
}

pub fn partial_with<K, I>(options: ObjectOptions, props: I) -> Type
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Type)>,
{
    object_with(ObjectOptions { partial: true, ..options }, props)
}

fn build(props: Properties, options: ObjectOptions) -> Type {
    let props_info: PropertiesInfo = props
        .iter()
        .map(|(key, ty)| (key.clone(), PropertyInfo { partial: options.partial, ty: ty.clone() }))
        .collect();
    let discriminators = if options.partial { Vec::new() } else { possible_discriminators(&props) };
    let is_default_name = options.name.is_none();
    let name = options.name.clone().unwrap_or_else(|| default_object_rep(&props_info));
    let shape = Arc::new(ObjectShape { props, props_info, options, discriminators });
    let validator_shape = shape.clone();
    Type::from_parts(TypeParts {
        name,
        basic_type: BasicType::Object,
        is_default_name,
        shape: Shape::Object(shape),
        literal_domain: None,
        validator: Arc::new(move |this, input, options| validate_object(&validator_shape, this, input, options)),
        auto_caster: None,
    })
}

/// Nested object-like children contribute their discriminators under the
/// key; children with a literal domain contribute themselves.
fn possible_discriminators(props: &Properties) -> Vec<PossibleDiscriminator> {
    let mut out = Vec::new();
    for (key, ty) in props {
        if let Some(nested) = ty.possible_discriminators() {
            out.extend(nested.iter().map(|d| PossibleDiscriminator {
                path: std::iter::once(key.clone()).chain(d.path.iter().cloned()).collect(),
                values: d.values.clone(),
            }));
        } else if let Some(domain) = ty.literal_domain() {
            out.push(PossibleDiscriminator { path: vec![key.clone()], values: domain.to_vec() });
        }
    }
    out
}

// ------------------------------- Validation ------------------------------ //

fn validate_object(
    shape: &ObjectShape,
    this: &Type,
    input: &Value,
    options: &mut ValidationOptions,
) -> ValidationResult {
    if shape.options.check_only && options.mode != Mode::Check {
        return options.with_mode(Mode::Check, |options| validate_object(shape, this, input, options));
    }
    let Some(obj) = input.as_object() else {
        return create_result(this, input, input.clone(), DetailKind::invalid_basic_type(BasicType::Object));
    };
    let opts = &shape.options;
    let mut details = Vec::new();

    if !opts.allow_unknown_properties {
        for (key, value) in obj.entries() {
            if shape.props.contains_key(&key) || (value.is_undefined() && !opts.strict_missing_keys) {
                continue;
            }
            details.push(MessageDetail::new(DetailKind::UnknownProperty { property: key }));
        }
    }

    let output = Object::new();
    for (key, child) in &shape.props {
        let present = obj.get(key);
        let missing = present.is_none();
        let value = present.unwrap_or(Value::Undefined);
        if opts.partial {
            if missing || (!opts.strict_missing_keys && value.is_undefined()) {
                continue;
            }
        } else if missing && opts.strict_missing_keys {
            details.push(missing_property(key, child));
            continue;
        }
        match child.validate_with(&value, options) {
            Ok(success) => {
                output.insert(key.clone(), success.value);
            }
            Err(_) if missing => details.push(missing_property(key, child)),
            Err(failure) => details.extend(prepend_path(failure, PathSegment::Key(key.clone()))),
        }
    }

    let value = match options.mode {
        Mode::Construct => Value::Object(output),
        Mode::Check => input.clone(),
    };
    create_result(this, input, value, details)
}

fn missing_property(key: &str, child: &Type) -> MessageDetail {
    MessageDetail::new(DetailKind::MissingProperty { property: key.to_string() }).with_type(child)
}

pub(crate) fn auto_cast_all(this: &Type, shape: &ObjectShape) -> Type {
    let props = shape.props.iter().map(|(key, ty)| (key.clone(), ty.auto_cast_all())).collect();
    build(
        props,
        ObjectOptions { name: Some(extension_name(this.name(), "autoCastAll")), ..shape.options.clone() },
    )
}

// ---------------------------- Derived objects ---------------------------- //

impl Type {
    fn object_shape(&self) -> Result<&ObjectShape, TypeError> {
        match self.shape() {
            Shape::Object(shape) => Ok(&**shape),
            _ => Err(TypeError::NotAnObjectType { name: self.name().to_string() }),
        }
    }

    /// The same object type with every property optional, named
    /// `Partial<Name>`.
    pub fn to_partial(&self) -> Result<Type, TypeError> {
        let shape = self.object_shape()?;
        Ok(build(
            shape.props.clone(),
            ObjectOptions {
                name: Some(format!("Partial<{}>", self.name())),
                partial: true,
                ..shape.options.clone()
            },
        ))
    }

    /// This object type plus the given optional properties. A custom name
    /// carries over.
    pub fn with_optional<K, I>(&self, props: I) -> Result<Type, TypeError>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Type)>,
    {
        let name = (!self.is_default_name()).then(|| self.name().to_string());
        self.with_optional_impl(name, props)
    }

    pub fn with_optional_named<K, I>(&self, name: impl Into<String>, props: I) -> Result<Type, TypeError>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Type)>,
    {
        self.with_optional_impl(Some(name.into()), props)
    }

    fn with_optional_impl<K, I>(&self, name: Option<String>, props: I) -> Result<Type, TypeError>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Type)>,
    {
        self.object_shape()?;
        let ty = intersection([self.clone(), partial(props)])?;
        Ok(match name {
            Some(name) => ty.with_name(name),
            None => ty,
        })
    }
}
