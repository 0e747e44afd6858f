//! The immutable [`Type`] and its construct/check pipeline.
//!
//! A `Type` is a cheap handle onto an immutable record. Derivation
//! operators (`with_name`, `with_parser`, ...) copy the record, replace the
//! named fields and hand back a new handle; the original never changes.
//! Identity is handle identity: clones are the same type, derivations are
//! not.
//!
//! Composite kinds the crate defines are a closed [`Shape`]; anything else
//! (primitives, user-defined kinds) plugs in through [`TypeImpl`].
pub mod intersection;
pub mod literal;
pub mod object;
pub mod primitive;

use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use serde_json::Map;
use tracing::trace;

use crate::error::{TypeError, ValidationError};
use crate::options::{Mode, ValidationOptions, Visit};
use crate::print::{extension_name, print_value};
use crate::result::{
    create_result, error_details, with_parser_input, DetailKind, Failure, MessageDetail, Success,
    ValidationResult, Verdict,
};
use crate::value::{BasicType, Literal, Value};

pub use intersection::IntersectionShape;
pub use object::ObjectShape;

// ------------------------------- Vocabulary ------------------------------ //

/// Free-form, type-specific settings such as bounds or patterns.
pub type TypeConfig = Map<String, serde_json::Value>;

/// Property name → child type, in declaration order.
pub type Properties = IndexMap<String, Type>;

/// Property name → optionality and child type.
pub type PropertiesInfo = IndexMap<String, PropertyInfo>;

#[derive(Clone, Debug)]
pub struct PropertyInfo {
    pub partial: bool,
    pub ty: Type,
}

/// A field that selects a union branch by itself.
#[derive(Clone, Debug, PartialEq)]
pub struct PossibleDiscriminator {
    pub path: Vec<String>,
    pub values: Vec<Literal>,
}

/// Returned by an auto-cast hook when the input cannot be coerced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AutoCastFailure;

pub(crate) type Validator =
    Arc<dyn Fn(&Type, &Value, &mut ValidationOptions) -> ValidationResult + Send + Sync>;
pub(crate) type Parser =
    Arc<dyn Fn(&Type, &Value, &mut ValidationOptions) -> ValidationResult + Send + Sync>;
pub(crate) type AutoCaster = Arc<dyn Fn(&Value) -> Result<Value, AutoCastFailure> + Send + Sync>;
pub type CombineConfig = Arc<dyn Fn(&TypeConfig, &TypeConfig) -> TypeConfig + Send + Sync>;

/// Structural kind of a type, for callers that need to look inside.
#[derive(Clone, Debug)]
pub enum Shape {
    Literal(Literal),
    Object(Arc<ObjectShape>),
    Intersection(Arc<IntersectionShape>),
    /// primitives and user-defined kinds
    Opaque,
}

/// Capability interface for kinds outside the built-in shapes.
pub trait TypeImpl: Send + Sync + 'static {
    fn name(&self) -> String;

    fn basic_type(&self) -> BasicType;

    /// Core validation. `this` is the (possibly derived) type being
    /// validated, so its name and config are the ones to report and obey.
    fn validate(&self, this: &Type, input: &Value, options: &mut ValidationOptions) -> ValidationResult;

    fn has_auto_cast(&self) -> bool {
        false
    }

    fn auto_cast(&self, _input: &Value) -> Result<Value, AutoCastFailure> {
        Err(AutoCastFailure)
    }

    fn literal_domain(&self) -> Option<Vec<Literal>> {
        None
    }

    fn config(&self) -> TypeConfig {
        TypeConfig::new()
    }

    /// How `with_config` merges a new config into the current one.
    fn combine_config(&self, current: &TypeConfig, new: &TypeConfig) -> TypeConfig {
        shallow_merge(current, new)
    }
}

fn shallow_merge(current: &TypeConfig, new: &TypeConfig) -> TypeConfig {
    let mut out = current.clone();
    for (k, v) in new {
        out.insert(k.clone(), v.clone());
    }
    out
}

#[derive(Clone, Debug, Default)]
pub struct ParserOptions {
    /// rename the resulting type
    pub name: Option<String>,
    /// feed the new parser's output through the previous parser
    pub chain: bool,
}

impl ParserOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), chain: false }
    }

    pub fn chained() -> Self {
        Self { name: None, chain: true }
    }
}

// ---------------------------------- Type --------------------------------- //

#[derive(Clone)]
pub struct Type {
    inner: Arc<TypeInner>,
}

struct TypeInner {
    name: String,
    basic_type: BasicType,
    is_default_name: bool,
    brand: Option<String>,
    config: TypeConfig,
    combine_config: CombineConfig,
    literal_domain: Option<Vec<Literal>>,
    shape: Shape,
    validator: Validator,
    parser: Option<Parser>,
    auto_caster: Option<AutoCaster>,
    // `None` inside a filled cell means "the type itself"
    auto_cast: OnceCell<Option<Type>>,
    auto_cast_all: OnceCell<Option<Type>>,
}

impl TypeInner {
    /// Field-for-field copy with empty memo cells.
    fn derived(&self) -> TypeInner {
        TypeInner {
            name: self.name.clone(),
            basic_type: self.basic_type,
            is_default_name: self.is_default_name,
            brand: self.brand.clone(),
            config: self.config.clone(),
            combine_config: self.combine_config.clone(),
            literal_domain: self.literal_domain.clone(),
            shape: self.shape.clone(),
            validator: self.validator.clone(),
            parser: self.parser.clone(),
            auto_caster: self.auto_caster.clone(),
            auto_cast: OnceCell::new(),
            auto_cast_all: OnceCell::new(),
        }
    }
}

/// Everything a built-in kind provides when it creates a type.
pub(crate) struct TypeParts {
    pub name: String,
    pub basic_type: BasicType,
    pub is_default_name: bool,
    pub shape: Shape,
    pub literal_domain: Option<Vec<Literal>>,
    pub validator: Validator,
    pub auto_caster: Option<AutoCaster>,
}

impl Type {
    /// Wrap a user-defined kind.
    pub fn new<T: TypeImpl>(imp: T) -> Type {
        let imp = Arc::new(imp);
        let validator: Validator = {
            let imp = imp.clone();
            Arc::new(move |this, input, options| imp.validate(this, input, options))
        };
        let auto_caster: Option<AutoCaster> = imp.has_auto_cast().then(|| {
            let imp = imp.clone();
            Arc::new(move |input: &Value| imp.auto_cast(input)) as AutoCaster
        });
        let combine_config: CombineConfig = {
            let imp = imp.clone();
            Arc::new(move |current, new| imp.combine_config(current, new))
        };
        Type {
            inner: Arc::new(TypeInner {
                name: imp.name(),
                basic_type: imp.basic_type(),
                is_default_name: false,
                brand: None,
                config: imp.config(),
                combine_config,
                literal_domain: imp.literal_domain(),
                shape: Shape::Opaque,
                validator,
                parser: None,
                auto_caster,
                auto_cast: OnceCell::new(),
                auto_cast_all: OnceCell::new(),
            }),
        }
    }

    pub(crate) fn from_parts(parts: TypeParts) -> Type {
        Type {
            inner: Arc::new(TypeInner {
                name: parts.name,
                basic_type: parts.basic_type,
                is_default_name: parts.is_default_name,
                brand: None,
                config: TypeConfig::new(),
                combine_config: Arc::new(shallow_merge),
                literal_domain: parts.literal_domain,
                shape: parts.shape,
                validator: parts.validator,
                parser: None,
                auto_caster: parts.auto_caster,
                auto_cast: OnceCell::new(),
                auto_cast_all: OnceCell::new(),
            }),
        }
    }

    /// Build a self-referencing type. `f` receives a stand-in that
    /// validates as the finished type; the result is named `name`.
    ///
    /// The stand-in holds the finished type strongly, so the graph is a
    /// reference cycle and lives as long as the process. Define recursive
    /// types once and share them.
    ///
    /// ```
    /// use osi_types::{object, partial, number, Type, Value};
    /// use serde_json::json;
    ///
    /// let node = Type::recursive("Node", |node| {
    ///     object([("value", number())])
    ///         .and(&partial([("next", node.clone())]))
    ///         .unwrap()
    /// });
    /// assert!(node.is(&Value::from(json!({"value": 1, "next": {"value": 2}}))));
    /// ```
    pub fn recursive(name: impl Into<String>, f: impl FnOnce(&Type) -> Type) -> Type {
        let name = name.into();
        let slot: Arc<OnceCell<Type>> = Arc::default();
        let target = slot.clone();
        let forward = Type::from_parts(TypeParts {
            name: name.clone(),
            basic_type: BasicType::Mixed,
            is_default_name: false,
            shape: Shape::Opaque,
            literal_domain: None,
            validator: Arc::new(move |this, input, options| {
                match target.get() {
                    Some(ty) => ty.validate_with(input, options),
                    None => create_result(
                        this,
                        input,
                        input.clone(),
                        DetailKind::custom("recursive type used before it was defined"),
                    ),
                }
            }),
            auto_caster: None,
        });
        let ty = f(&forward).with_name(name);
        let _ = slot.set(ty.clone());
        ty
    }

    // ------------------------------ accessors ---------------------------- //

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn basic_type(&self) -> BasicType {
        self.inner.basic_type
    }

    /// Whether the name was generated from the structure.
    pub fn is_default_name(&self) -> bool {
        self.inner.is_default_name
    }

    pub fn brand(&self) -> Option<&str> {
        self.inner.brand.as_deref()
    }

    pub fn config(&self) -> &TypeConfig {
        &self.inner.config
    }

    /// The finite set of literals this type accepts, if it has one.
    pub fn literal_domain(&self) -> Option<&[Literal]> {
        self.inner.literal_domain.as_deref()
    }

    pub fn shape(&self) -> &Shape {
        &self.inner.shape
    }

    pub fn has_parser(&self) -> bool {
        self.inner.parser.is_some()
    }

    pub fn is_object_like(&self) -> bool {
        matches!(self.inner.shape, Shape::Object(_) | Shape::Intersection(_))
    }

    pub fn props(&self) -> Option<&Properties> {
        match &self.inner.shape {
            Shape::Object(s) => Some(&s.props),
            Shape::Intersection(s) => Some(&s.props),
            _ => None,
        }
    }

    pub fn props_info(&self) -> Option<&PropertiesInfo> {
        match &self.inner.shape {
            Shape::Object(s) => Some(&s.props_info),
            Shape::Intersection(s) => Some(&s.props_info),
            _ => None,
        }
    }

    pub fn possible_discriminators(&self) -> Option<&[PossibleDiscriminator]> {
        match &self.inner.shape {
            Shape::Object(s) => Some(&s.discriminators),
            Shape::Intersection(s) => Some(&s.discriminators),
            _ => None,
        }
    }

    fn id(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }

    // ------------------------------ pipeline ----------------------------- //

    /// Validate in construct mode with a fresh context.
    pub fn validate(&self, input: &Value) -> ValidationResult {
        self.validate_with(input, &mut ValidationOptions::construct())
    }

    /// Validate within an existing context. Composite types call this on
    /// their children.
    pub fn validate_with(&self, input: &Value, options: &mut ValidationOptions) -> ValidationResult {
        let key = input.identity().map(|id| (self.id(), id));
        if let Some(key) = key {
            match options.visited().get(key) {
                Some(Visit::Done(result)) => {
                    trace!(ty = %self.name(), "reusing result for visited input");
                    return result.clone();
                }
                Some(Visit::InProgress) => {
                    trace!(ty = %self.name(), "cycle closed, assuming success");
                    return Ok(Success::new(input.clone()));
                }
                None => options.visited().enter(key, self, input),
            }
        }
        let result = self.run(input, options);
        if let Some(key) = key {
            options.visited().finish(key, result.clone());
        }
        result
    }

    fn run(&self, input: &Value, options: &mut ValidationOptions) -> ValidationResult {
        let parser = match (&self.inner.parser, options.mode) {
            (Some(parser), Mode::Construct) => parser.clone(),
            _ => return (self.inner.validator)(self, input, options),
        };
        let parsed = match parser(self, input, options) {
            Ok(success) => success.value,
            Err(failure) => return Err(failure.with_context("parser")),
        };
        with_parser_input((self.inner.validator)(self, &parsed, options), input)
    }

    pub fn assert(&self, input: &Value) -> Result<(), ValidationError> {
        self.validate_with(input, &mut ValidationOptions::check())
            .map(|_| ())
            .map_err(ValidationError::from_failure)
    }

    /// Check mode: no parsers run, the original input comes back.
    pub fn check(&self, input: &Value) -> Result<Value, ValidationError> {
        self.assert(input)?;
        Ok(input.clone())
    }

    /// Construct mode: parsers run, the result may be a rebuilt value.
    pub fn construct(&self, input: &Value) -> Result<Value, ValidationError> {
        self.validate(input)
            .map(|success| success.value)
            .map_err(ValidationError::from_failure)
    }

    /// Same as [`Type::construct`].
    pub fn literal(&self, input: &Value) -> Result<Value, ValidationError> {
        self.construct(input)
    }

    pub fn is(&self, input: &Value) -> bool {
        self.validate_with(input, &mut ValidationOptions::check()).is_ok()
    }

    /// Guard `f` with a construct-mode precondition on its input.
    pub fn and_then<R, F>(&self, f: F) -> impl Fn(&Value) -> Result<R, ValidationError> + use<R, F>
    where
        F: Fn(Value) -> R,
    {
        let ty = self.clone();
        move |input| Ok(f(ty.precondition(input)?))
    }

    /// Like [`Type::and_then`], passing extra arguments through untouched.
    pub fn and_then_with<A, R, F>(&self, f: F) -> impl Fn(&Value, A) -> Result<R, ValidationError> + use<A, R, F>
    where
        F: Fn(Value, A) -> R,
    {
        let ty = self.clone();
        move |input, args| Ok(f(ty.precondition(input)?, args))
    }

    fn precondition(&self, input: &Value) -> Result<Value, ValidationError> {
        self.validate(input)
            .map(|success| success.value)
            .map_err(|failure| ValidationError::from_failure(failure.with_context("precondition")))
    }

    // ----------------------------- derivation ---------------------------- //

    fn derive(&self, f: impl FnOnce(&mut TypeInner)) -> Type {
        let mut inner = self.inner.derived();
        f(&mut inner);
        Type { inner: Arc::new(inner) }
    }

    /// Derive a type whose callbacks need a handle on the type installing
    /// them.
    fn derive_cyclic(&self, f: impl FnOnce(&Weak<TypeInner>, &mut TypeInner)) -> Type {
        Type {
            inner: Arc::new_cyclic(|weak| {
                let mut inner = self.inner.derived();
                f(weak, &mut inner);
                inner
            }),
        }
    }

    pub fn with_name(&self, name: impl Into<String>) -> Type {
        let name = name.into();
        self.derive(|inner| {
            inner.name = name;
            inner.is_default_name = false;
        })
    }

    /// Rename and tag nominally. Validation is unchanged.
    pub fn with_brand(&self, name: impl Into<String>) -> Type {
        let name = name.into();
        self.derive(|inner| {
            inner.brand = Some(name.clone());
            inner.name = name;
            inner.is_default_name = false;
        })
    }

    /// Rename, brand, and merge `config` into the current config.
    pub fn with_config(&self, name: impl Into<String>, config: TypeConfig) -> Type {
        let name = name.into();
        self.derive(|inner| {
            inner.config = (inner.combine_config)(&inner.config, &config);
            inner.brand = Some(name.clone());
            inner.name = name;
            inner.is_default_name = false;
        })
    }

    /// Replace the function `with_config` uses to merge configs.
    pub fn with_config_combiner<F>(&self, combine: F) -> Type
    where
        F: Fn(&TypeConfig, &TypeConfig) -> TypeConfig + Send + Sync + 'static,
    {
        self.derive(|inner| inner.combine_config = Arc::new(combine))
    }

    /// Install a parser that runs before validation in construct mode.
    ///
    /// Errors returned by `parse` become failures of the new type. With
    /// `chain`, the output is fed through the previous parser as well.
    pub fn with_parser<F>(&self, options: ParserOptions, parse: F) -> Type
    where
        F: Fn(&Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        let previous = self.inner.parser.clone();
        let ParserOptions { name, chain } = options;
        self.derive_cyclic(move |weak, inner| {
            if let Some(name) = name {
                inner.name = name;
                inner.is_default_name = false;
            }
            let weak = weak.clone();
            inner.parser = Some(Arc::new(move |this, input, options| {
                let installer = upgrade(&weak, this);
                let parsed = match parse(input) {
                    Ok(value) => value,
                    Err(e) => return Err(Failure::new(&installer, input, error_details(e))),
                };
                match &previous {
                    Some(previous) if chain => {
                        with_parser_input(previous(this, &parsed, options), input)
                    }
                    _ => Ok(Success::new(parsed)),
                }
            }));
        })
    }

    /// Add a check that runs after the current validation succeeds. A plain
    /// `false` reports `additional validation failed`.
    pub fn with_validation<F, V>(&self, validation: F) -> Type
    where
        F: Fn(&Value) -> V + Send + Sync + 'static,
        V: Into<Verdict>,
    {
        self.refine(None, move |value| match Into::<Verdict>::into(validation(value)) {
            Verdict::Fail => Verdict::from("additional validation failed"),
            verdict => verdict,
        })
    }

    /// Add a named, branded restriction on top of the current validation.
    pub fn with_constraint<F, V>(&self, name: impl Into<String>, constraint: F) -> Type
    where
        F: Fn(&Value) -> V + Send + Sync + 'static,
        V: Into<Verdict>,
    {
        self.refine(Some(name.into()), move |value| constraint(value).into())
    }

    fn refine<F>(&self, name: Option<String>, check: F) -> Type
    where
        F: Fn(&Value) -> Verdict + Send + Sync + 'static,
    {
        let base = self.clone();
        self.derive_cyclic(move |weak, inner| {
            if let Some(name) = name {
                inner.brand = Some(name.clone());
                inner.name = name;
                inner.is_default_name = false;
            }
            let weak = weak.clone();
            let base_validator = base.inner.validator.clone();
            inner.validator = Arc::new(move |this, input, options| {
                let installer = upgrade(&weak, this);
                let value = match base_validator(&base, input, options) {
                    Ok(success) => success.value,
                    Err(failure) => return Err(failure.reattributed(&installer, input)),
                };
                let verdict = check(&value);
                create_result(&installer, &value, value.clone(), verdict)
            });
        })
    }

    /// Attach extra members computed from this type.
    pub fn extend_with<E>(&self, factory: impl FnOnce(&Type) -> E) -> Extended<E> {
        let ext = factory(self);
        Extended { ty: self.clone(), ext }
    }

    /// The same type with its auto-cast hook installed as parser, unless it
    /// has no hook or already has a parser.
    pub fn auto_cast(&self) -> Type {
        self.inner
            .auto_cast
            .get_or_init(|| self.create_auto_cast())
            .clone()
            .unwrap_or_else(|| self.clone())
    }

    fn create_auto_cast(&self) -> Option<Type> {
        if self.inner.parser.is_some() {
            return None;
        }
        let caster = self.inner.auto_caster.clone()?;
        Some(self.derive(|inner| {
            inner.name = extension_name(&inner.name, "autoCast");
            inner.parser = Some(Arc::new(move |this, input, _| match caster(input) {
                Ok(value) => Ok(Success::new(value)),
                Err(AutoCastFailure) => Err(Failure::new(
                    this,
                    input,
                    vec![MessageDetail::new(DetailKind::CustomMessage {
                        message: format!("could not autocast value: {}", print_value(input)),
                        omit_input: true,
                    })],
                )),
            }));
        }))
    }

    /// Auto-casting pushed into every nested type.
    pub fn auto_cast_all(&self) -> Type {
        self.inner
            .auto_cast_all
            .get_or_init(|| match &self.inner.shape {
                Shape::Object(shape) => Some(object::auto_cast_all(self, shape)),
                Shape::Intersection(shape) => Some(intersection::auto_cast_all(self, shape)),
                Shape::Literal(_) | Shape::Opaque => None,
            })
            .clone()
            .unwrap_or_else(|| self.auto_cast())
    }

    /// Unions live in a separate implementation; the core only reserves
    /// the operator.
    pub fn or(&self, other: &Type) -> Result<Type, TypeError> {
        Err(TypeError::UnionUnavailable {
            left: self.name().to_string(),
            right: other.name().to_string(),
        })
    }

    /// Intersect two object-like types.
    pub fn and(&self, other: &Type) -> Result<Type, TypeError> {
        intersection::intersection([self.clone(), other.clone()])
    }
}

fn upgrade(weak: &Weak<TypeInner>, fallback: &Type) -> Type {
    weak.upgrade()
        .map(|inner| Type { inner })
        .unwrap_or_else(|| fallback.clone())
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Type {}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Type").field(&self.inner.name).finish()
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.name)
    }
}

/// A type plus extra members attached by [`Type::extend_with`].
#[derive(Clone, Debug)]
pub struct Extended<E> {
    ty: Type,
    ext: E,
}

impl<E> Extended<E> {
    pub fn ext(&self) -> &E {
        &self.ext
    }

    pub fn into_type(self) -> Type {
        self.ty
    }
}

impl<E> Deref for Extended<E> {
    type Target = Type;

    fn deref(&self) -> &Type {
        &self.ty
    }
}
