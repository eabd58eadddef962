use crate::error::DriverError;
use crate::value::{Scalar, ValueType};

/// Host-side description of one design parameter
///
/// A scalar parameter has one element; a vector parameter has one element per
/// entry of `value`, each with its own bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    /// Parameter name as known by the host
    pub name: String,
    /// Lower bound per element
    pub lower: Vec<f64>,
    /// Upper bound per element
    pub upper: Vec<f64>,
    /// Current value per element
    pub value: Vec<Scalar>,
    /// Type descriptor supplied by the host
    pub value_type: ValueType,
    /// Enumerated choices, when the parameter may only take listed values
    pub choices: Option<Vec<Scalar>>,
}

impl ParameterSpec {
    pub fn float(name: &str, value: f64, lower: f64, upper: f64) -> Self {
        Self {
            name: name.to_string(),
            lower: vec![lower],
            upper: vec![upper],
            value: vec![Scalar::Float(value)],
            value_type: ValueType::Float,
            choices: None,
        }
    }

    /// Vector of floats sharing the same bounds
    pub fn float_vec(name: &str, values: &[f64], lower: f64, upper: f64) -> Self {
        Self {
            name: name.to_string(),
            lower: vec![lower; values.len()],
            upper: vec![upper; values.len()],
            value: values.iter().map(|&v| Scalar::Float(v)).collect(),
            value_type: ValueType::Float,
            choices: None,
        }
    }

    pub fn integer(name: &str, value: i64, lower: i64, upper: i64) -> Self {
        Self {
            name: name.to_string(),
            lower: vec![lower as f64],
            upper: vec![upper as f64],
            value: vec![Scalar::Int(value)],
            value_type: ValueType::Integer,
            choices: None,
        }
    }

    pub fn boolean(name: &str, value: bool) -> Self {
        Self {
            name: name.to_string(),
            lower: vec![0.0],
            upper: vec![1.0],
            value: vec![Scalar::Bool(value)],
            value_type: ValueType::Boolean,
            choices: None,
        }
    }

    /// Parameter restricted to `choices`; the type descriptor follows the current value
    pub fn enumerated(name: &str, value: Scalar, choices: Vec<Scalar>) -> Self {
        let value_type = match value {
            Scalar::Float(_) => ValueType::Float,
            Scalar::Int(_) => ValueType::Integer,
            Scalar::Bool(_) => ValueType::Boolean,
            Scalar::Text(_) => ValueType::Other("str".to_string()),
        };
        let upper = choices.len().saturating_sub(1) as f64;
        Self {
            name: name.to_string(),
            lower: vec![0.0],
            upper: vec![upper],
            value: vec![value],
            value_type,
            choices: Some(choices),
        }
    }

    /// Replace the type descriptor
    pub fn with_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }

    /// Number of scalar elements
    pub fn size(&self) -> usize {
        self.value.len()
    }

    /// Flattened name of element `i`: `name` for scalars, `name[i]` for vectors
    pub fn element_name(&self, i: usize) -> String {
        if self.size() == 1 {
            self.name.clone()
        } else {
            format!("{}[{}]", self.name, i)
        }
    }
}

/// Solver-side classification of a parameter
#[derive(Debug, Clone, PartialEq)]
pub enum VariableKind {
    Continuous,
    Integer,
    /// Index into the listed choices
    Discrete(Vec<Scalar>),
}

impl VariableKind {
    pub fn is_integral(&self) -> bool {
        !matches!(self, VariableKind::Continuous)
    }
}

/// Decide the variable kind of a parameter.
///
/// Precedence: enumerated choices, then boolean, then integer, then float.
/// Anything else is rejected.
pub fn classify(spec: &ParameterSpec) -> Result<VariableKind, DriverError> {
    if let Some(choices) = &spec.choices {
        if choices.is_empty() {
            return Err(DriverError::InvalidParameterType {
                name: spec.name.clone(),
                reason: "empty choice list".to_string(),
            });
        }
        return Ok(VariableKind::Discrete(choices.clone()));
    }
    match &spec.value_type {
        ValueType::Boolean => Ok(VariableKind::Discrete(vec![
            Scalar::Bool(true),
            Scalar::Bool(false),
        ])),
        ValueType::Integer => Ok(VariableKind::Integer),
        ValueType::Float => Ok(VariableKind::Continuous),
        ValueType::Other(type_name) => Err(DriverError::InvalidParameterType {
            name: spec.name.clone(),
            reason: format!("values of type {} are not supported", type_name),
        }),
    }
}
