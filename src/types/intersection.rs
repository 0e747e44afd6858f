//! Structural AND over object-like types.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::TypeError;
use crate::options::{Mode, ValidationOptions};
use crate::print::{brackets_if_needed, default_object_rep, extension_name, Embedding};
use crate::result::{create_result, DetailKind, ValidationResult};
use crate::types::{PossibleDiscriminator, Properties, PropertiesInfo, Shape, Type, TypeParts};
use crate::value::{BasicType, Object, Value};

/// What to do when two members declare the same property.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverlapPolicy {
    /// Log a warning; the later member's property type wins.
    #[default]
    LastWins,
    /// Refuse to build the intersection.
    Reject,
}

#[derive(Clone, Debug, Default)]
pub struct IntersectionOptions {
    pub name: Option<String>,
    pub overlap: OverlapPolicy,
}

#[derive(Debug)]
pub struct IntersectionShape {
    pub members: Vec<Type>,
    pub props: Properties,
    pub props_info: PropertiesInfo,
    pub discriminators: Vec<PossibleDiscriminator>,
    /// Merged `{ ... }` rendering of every member's properties.
    pub combined_name: String,
    pub overlap: OverlapPolicy,
}

// ------------------------------ Constructors ----------------------------- //

pub fn intersection<I: IntoIterator<Item = Type>>(types: I) -> Result<Type, TypeError> {
    intersection_with(IntersectionOptions::default(), types)
}

pub fn intersection_named<I: IntoIterator<Item = Type>>(name: impl Into<String>, types: I) -> Result<Type, TypeError> {
    intersection_with(IntersectionOptions { name: Some(name.into()), ..Default::default() }, types)
}

/// Every member must have basic type `object`. Misuse is reported here,
/// never at validation time.
pub fn intersection_with<I: IntoIterator<Item = Type>>(
    options: IntersectionOptions,
    types: I,
) -> Result<Type, TypeError> {
    let members: Vec<Type> = types.into_iter().collect();
    if members.is_empty() {
        return Err(TypeError::EmptyIntersection);
    }
    let offenders: Vec<String> = members
        .iter()
        .filter(|t| t.basic_type() != BasicType::Object)
        .map(|t| t.name().to_string())
        .collect();
    if !offenders.is_empty() {
        debug!(?offenders, "rejected intersection of non-object types");
        return Err(TypeError::NotObjectLike { names: offenders });
    }

    let overlap = overlapping_keys(&members);
    if !overlap.is_empty() {
        match options.overlap {
            OverlapPolicy::LastWins => {
                warn!(keys = ?overlap, "overlapping properties in intersection, the last member wins")
            }
            OverlapPolicy::Reject => {
                debug!(keys = ?overlap, "rejected intersection with overlapping properties");
                return Err(TypeError::OverlappingProperties { keys: overlap });
            }
        }
    }

    let mut props = Properties::new();
    let mut props_info = PropertiesInfo::new();
    for member in &members {
        for (key, ty) in member.props().into_iter().flatten() {
            props.insert(key.clone(), ty.clone());
        }
        for (key, info) in member.props_info().into_iter().flatten() {
            props_info.insert(key.clone(), info.clone());
        }
    }
    let discriminators = members
        .iter()
        .flat_map(|m| m.possible_discriminators().unwrap_or_default().iter().cloned())
        .collect();
    let combined_name = combined_name(&members);
    let is_default_name = options.name.is_none();
    let name = options.name.unwrap_or_else(|| default_name(&members));

    let shape = Arc::new(IntersectionShape {
        members,
        props,
        props_info,
        discriminators,
        combined_name,
        overlap: options.overlap,
    });
    let validator_shape = shape.clone();
    Ok(Type::from_parts(TypeParts {
        name,
        basic_type: BasicType::Object,
        is_default_name,
        shape: Shape::Intersection(shape),
        literal_domain: None,
        validator: Arc::new(move |this, input, options| {
            validate_intersection(&validator_shape, this, input, options)
        }),
        auto_caster: None,
    }))
}

fn overlapping_keys(members: &[Type]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut overlap = BTreeSet::new();
    for member in members {
        for key in member.props().into_iter().flat_map(|p| p.keys()) {
            if !seen.insert(key.clone()) {
                overlap.insert(key.clone());
            }
        }
    }
    overlap.into_iter().collect()
}

/// A required property beats an optional one of the same name; otherwise
/// the first occurrence is kept.
fn combined_name(members: &[Type]) -> String {
    let mut collected = PropertiesInfo::new();
    for info in members.iter().filter_map(Type::props_info) {
        for (key, prop) in info {
            let replace = match collected.get(key) {
                None => true,
                Some(existing) => existing.partial && !prop.partial,
            };
            if replace {
                collected.insert(key.clone(), prop.clone());
            }
        }
    }
    default_object_rep(&collected)
}

/// Default-named object-like members merge into one `{ ... }` rendering;
/// the rest are joined with ` & `.
fn default_name(members: &[Type]) -> String {
    let (combinable, rest): (Vec<Type>, Vec<Type>) = members
        .iter()
        .cloned()
        .partition(|t| t.is_default_name() && t.is_object_like());
    let mut names: Vec<String> = rest
        .iter()
        .map(|t| brackets_if_needed(t.name(), Embedding::Intersection))
        .collect();
    if !combinable.is_empty() {
        names.push(combined_name(&combinable));
    }
    names.join(" & ")
}

// ------------------------------- Validation ------------------------------ //

/// Every member sees the same original input.
fn validate_intersection(
    shape: &IntersectionShape,
    this: &Type,
    input: &Value,
    options: &mut ValidationOptions,
) -> ValidationResult {
    if input.as_object().is_none() {
        return create_result(this, input, input.clone(), DetailKind::invalid_basic_type(BasicType::Object));
    }
    let mut details = Vec::new();
    let mut values = Vec::new();
    for member in &shape.members {
        match member.validate_with(input, options) {
            Ok(success) => values.push(success.value),
            Err(failure) => details.extend(failure.into_details()),
        }
    }
    let value = if details.is_empty() && options.mode == Mode::Construct {
        let merged = Object::new();
        for obj in values.iter().filter_map(Value::as_object) {
            for (key, value) in obj.entries() {
                merged.insert(key, value);
            }
        }
        Value::Object(merged)
    } else {
        input.clone()
    };
    create_result(this, input, value, details)
}

pub(crate) fn auto_cast_all(this: &Type, shape: &IntersectionShape) -> Type {
    let options = IntersectionOptions {
        name: Some(extension_name(this.name(), "autoCastAll")),
        overlap: shape.overlap,
    };
    // members keep their basic type, so this only fails if the original could not have been built
    intersection_with(options, shape.members.iter().map(Type::auto_cast_all)).unwrap_or_else(|_| this.clone())
}
