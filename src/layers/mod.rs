//! Layer abstractions for neural fields
//!
//! A layer is a labeled, shaped array of `f64` with a fixed-length
//! parameter vector. Three kinds exist:
//!
//! - input layers, filled by the caller and never recomputed
//! - function layers, recomputed from their predecessors on every tick
//! - buffered layers, integrating their predecessor over time into a
//!   double buffer
//!
//! Layers are owned by a `Network` and refer to their predecessors through
//! `LayerId` handles into it.

pub mod buffered;
pub mod function;
pub mod gaussian;
pub mod heaviside;
pub mod input;
pub mod shape;

use std::any::type_name;
use std::fmt;

use crate::error::{FieldError, FieldResult};
use crate::utils::activations;
use crate::utils::rng::SimpleRng;

pub use buffered::{BufferedLayer, BufferedOp};
pub use function::{FunctionLayer, FunctionOp, Vectorized};
pub use gaussian::{GaussianKernel, GaussianLink};
pub use heaviside::HeavisideLink;
pub use input::{InputId, InputLayer};
pub use shape::{Shape, ValueBuffer};

/// Handle to a layer owned by a `Network`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub(crate) usize);

impl LayerId {
    /// Position of the layer in its network, in insertion order.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a layer is and the state its kind needs.
#[derive(Debug)]
pub enum LayerKind {
    Input(InputLayer),
    Function(FunctionLayer),
    Buffered(BufferedLayer),
}

/// A labeled, shaped array holder with a parameter vector.
///
/// # Fields
///
/// * `label` - Unique name within a network, empty for unlabeled layers
/// * `parameters` - Numeric knobs, their count fixed by the layer kind
/// * `values` - Current output of the layer
/// * `kind` - Input, function or buffered behaviour
///
/// # Example
///
/// ```ignore
/// use rust_neural_fields::layers::{Layer, Shape};
///
/// let mut gexc = Layer::gaussian("gexc", Shape::d1(100)?, 1.5, 2.0, false, true)?;
/// gexc.set_parameters(&[1.2, 3.0])?;
/// assert_eq!(gexc.parameters(), &[1.2, 3.0]);
/// ```
pub struct Layer {
    label: String,
    parameters: Vec<f64>,
    values: ValueBuffer,
    kind: LayerKind,
}

impl Layer {
    fn with_kind(label: impl Into<String>, shape: Shape, parameters: Vec<f64>, kind: LayerKind) -> Self {
        Self {
            label: label.into(),
            parameters,
            values: ValueBuffer::zeros(shape),
            kind,
        }
    }

    fn function_kind(label: impl Into<String>, shape: Shape, parameters: Vec<f64>, op: FunctionOp) -> Self {
        Self::with_kind(label, shape, parameters, LayerKind::Function(FunctionLayer::new(op)))
    }

    /// Input layer fed with values of type `T` through `filler`.
    pub fn input<T, F>(label: impl Into<String>, shape: Shape, filler: F) -> Self
    where
        T: 'static,
        F: Fn(&mut [f64], &T) + 'static,
    {
        Self::with_kind(label, shape, Vec::new(), LayerKind::Input(InputLayer::new(filler)))
    }

    /// Gaussian convolution of one predecessor, parameters `[amplitude, spread]`.
    pub fn gaussian(
        label: impl Into<String>,
        shape: Shape,
        amplitude: f64,
        spread: f64,
        toric: bool,
        scale: bool,
    ) -> FieldResult<Self> {
        let label = label.into();
        let link = GaussianLink::new(&label, &shape, amplitude, spread, toric, scale)?;
        Ok(Self::function_kind(label, shape, vec![amplitude, spread], FunctionOp::Gaussian(link)))
    }

    /// Box-window sum of one predecessor, parameters `[weight, radius]`.
    pub fn heaviside(
        label: impl Into<String>,
        shape: Shape,
        weight: f64,
        radius: f64,
        toric: bool,
    ) -> FieldResult<Self> {
        let label = label.into();
        let link = HeavisideLink::new(&label, &shape, toric)?;
        heaviside::validate_radius(&label, radius)?;
        Ok(Self::function_kind(label, shape, vec![weight, radius], FunctionOp::Heaviside(link)))
    }

    /// Global coupling `weight / size · Σ predecessor`.
    pub fn full(label: impl Into<String>, shape: Shape, weight: f64) -> Self {
        Self::function_kind(label, shape, vec![weight], FunctionOp::Full)
    }

    /// Element-wise sum of two predecessors.
    pub fn sum(label: impl Into<String>, shape: Shape) -> Self {
        Self::function_kind(label, shape, Vec::new(), FunctionOp::Sum)
    }

    /// Uniform field holding `value`.
    pub fn constant(label: impl Into<String>, shape: Shape, value: f64) -> Self {
        let mut layer = Self::function_kind(label, shape, vec![value], FunctionOp::Constant);
        layer.values.fill(value);
        layer
    }

    /// Named transfer function (`"sigmoid"` or `"relu"`) of one predecessor.
    pub fn function(label: impl Into<String>, shape: Shape, name: &str) -> FieldResult<Self> {
        let f = activations::by_name(name)?;
        Ok(Self::vectorized(label, shape, name.to_lowercase(), f))
    }

    /// Caller-supplied element-wise map of one predecessor.
    pub fn vectorized(label: impl Into<String>, shape: Shape, name: impl Into<String>, f: fn(f64) -> f64) -> Self {
        let op = FunctionOp::Vectorized(Vectorized::new(name, f));
        Self::function_kind(label, shape, Vec::new(), op)
    }

    /// Noise redrawn uniformly in `[min, max)` on every update.
    pub fn uniform_noise(
        label: impl Into<String>,
        shape: Shape,
        min: f64,
        max: f64,
        seed: u64,
    ) -> FieldResult<Self> {
        let label = label.into();
        validate_noise_range(&label, min, max)?;
        let op = FunctionOp::UniformNoise(SimpleRng::new(seed));
        Ok(Self::function_kind(label, shape, vec![min, max], op))
    }

    /// First-order low-pass filter of one predecessor, parameters `[alpha]`.
    pub fn leaky_integrator(label: impl Into<String>, shape: Shape, alpha: f64) -> FieldResult<Self> {
        let label = label.into();
        validate_alpha(&label, alpha)?;
        let buffered = BufferedLayer::new(BufferedOp::LeakyIntegrator, shape.size());
        Ok(Self::with_kind(label, shape, vec![alpha], LayerKind::Buffered(buffered)))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Label, or the operator name for unlabeled layers.
    pub fn display_name(&self) -> String {
        if self.label.is_empty() {
            format!("<unlabeled {}>", self.name())
        } else {
            self.label.clone()
        }
    }

    /// Name of the layer's operator.
    pub fn name(&self) -> &'static str {
        match &self.kind {
            LayerKind::Input(_) => "input",
            LayerKind::Function(f) => f.op.name(),
            LayerKind::Buffered(b) => b.op.name(),
        }
    }

    pub fn shape(&self) -> &Shape {
        self.values.shape()
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[f64] {
        self.values.as_slice()
    }

    pub fn parameters(&self) -> &[f64] {
        &self.parameters
    }

    pub fn kind(&self) -> &LayerKind {
        &self.kind
    }

    pub fn is_input(&self) -> bool {
        matches!(self.kind, LayerKind::Input(_))
    }

    pub fn is_function(&self) -> bool {
        matches!(self.kind, LayerKind::Function(_))
    }

    pub fn is_buffered(&self) -> bool {
        matches!(self.kind, LayerKind::Buffered(_))
    }

    /// Predecessors in connection order.
    pub fn predecessors(&self) -> &[LayerId] {
        match &self.kind {
            LayerKind::Input(_) => &[],
            LayerKind::Function(f) => &f.predecessors,
            LayerKind::Buffered(b) => match &b.predecessor {
                Some(p) => std::slice::from_ref(p),
                None => &[],
            },
        }
    }

    /// The Gaussian link of a Gaussian layer.
    pub fn gaussian_link(&self) -> Option<&GaussianLink> {
        match &self.kind {
            LayerKind::Function(FunctionLayer {
                op: FunctionOp::Gaussian(link),
                ..
            }) => Some(link),
            _ => None,
        }
    }

    /// Name of the type an input layer is fed with.
    pub fn input_type(&self) -> Option<&'static str> {
        match &self.kind {
            LayerKind::Input(input) => Some(input.input_type()),
            _ => None,
        }
    }

    pub fn parameter_count(&self) -> usize {
        match &self.kind {
            LayerKind::Input(_) => 0,
            LayerKind::Function(f) => f.op.parameter_count(),
            LayerKind::Buffered(b) => b.op.parameter_count(),
        }
    }

    /// Replace the parameter vector.
    ///
    /// The vector must have the layer's fixed parameter count. Gaussian
    /// layers rebuild their kernel and constant layers refill their values;
    /// nothing changes if the new values are rejected.
    pub fn set_parameters(&mut self, parameters: &[f64]) -> FieldResult<()> {
        let expected = self.parameter_count();
        if parameters.len() != expected {
            return Err(FieldError::ParameterArityMismatch {
                label: self.display_name(),
                expected,
                found: parameters.len(),
            });
        }

        let label = self.display_name();
        match &mut self.kind {
            LayerKind::Input(_) => {}
            LayerKind::Function(f) => match &mut f.op {
                FunctionOp::Gaussian(link) => {
                    link.rebuild(&label, self.values.shape(), parameters[0], parameters[1])?
                }
                FunctionOp::Heaviside(_) => heaviside::validate_radius(&label, parameters[1])?,
                FunctionOp::UniformNoise(_) => validate_noise_range(&label, parameters[0], parameters[1])?,
                FunctionOp::Constant => self.values.fill(parameters[0]),
                FunctionOp::Full | FunctionOp::Sum | FunctionOp::Vectorized(_) => {}
            },
            LayerKind::Buffered(b) => match b.op {
                BufferedOp::LeakyIntegrator => validate_alpha(&label, parameters[0])?,
            },
        }
        self.parameters.copy_from_slice(parameters);
        Ok(())
    }

    /// Append (function layers) or set (buffered layers) a predecessor.
    pub(crate) fn connect_from(&mut self, source: LayerId, source_shape: &Shape) -> FieldResult<()> {
        let label = self.display_name();
        let shape_mismatch = |expected: &Shape| FieldError::ShapeMismatch {
            label: label.clone(),
            expected: expected.clone(),
            found: source_shape.clone(),
        };

        match &mut self.kind {
            LayerKind::Input(_) => Err(FieldError::InvalidConnection {
                label: label.clone(),
                reason: "input layers have no predecessors".to_string(),
            }),
            LayerKind::Function(f) => {
                let arity = f.op.arity();
                if f.predecessors.len() >= arity {
                    return Err(FieldError::InvalidConnection {
                        label: label.clone(),
                        reason: format!("a {} layer takes {} predecessor(s)", f.op.name(), arity),
                    });
                }
                if !f.op.accepts_any_shape() && source_shape != self.values.shape() {
                    return Err(shape_mismatch(self.values.shape()));
                }
                f.predecessors.push(source);
                Ok(())
            }
            LayerKind::Buffered(b) => {
                if source_shape != self.values.shape() {
                    return Err(shape_mismatch(self.values.shape()));
                }
                b.predecessor = Some(source);
                Ok(())
            }
        }
    }

    /// Remove `source` from the predecessors; returns whether it was there.
    pub(crate) fn disconnect_from(&mut self, source: LayerId) -> bool {
        match &mut self.kind {
            LayerKind::Input(_) => false,
            LayerKind::Function(f) => match f.predecessors.iter().position(|&p| p == source) {
                Some(pos) => {
                    f.predecessors.remove(pos);
                    true
                }
                None => false,
            },
            LayerKind::Buffered(b) => {
                if b.predecessor == Some(source) {
                    b.predecessor = None;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Fail with `MissingConnection` if the layer lacks predecessors.
    pub(crate) fn check_connections(&self) -> FieldResult<()> {
        let (expected, found) = match &self.kind {
            LayerKind::Input(_) => return Ok(()),
            LayerKind::Function(f) => (f.op.arity(), f.predecessors.len()),
            LayerKind::Buffered(b) => (1, usize::from(b.predecessor.is_some())),
        };
        if found < expected {
            return Err(FieldError::MissingConnection {
                label: self.display_name(),
                expected,
                found,
            });
        }
        Ok(())
    }

    /// Recompute the layer from its predecessors.
    ///
    /// Function layers write their values; buffered layers write the shadow
    /// buffer exposed by the next `swap`. Input layers are left alone.
    pub(crate) fn update(&mut self, others: &Others<'_>) -> FieldResult<()> {
        self.check_connections()?;
        let Layer {
            parameters,
            values,
            kind,
            ..
        } = self;

        match kind {
            LayerKind::Input(_) => {}
            LayerKind::Function(f) => {
                let preds = &f.predecessors;
                let out = values.as_mut_slice();
                match &mut f.op {
                    FunctionOp::Gaussian(link) => link.update(others.values(preds[0])?, out),
                    FunctionOp::Heaviside(link) => {
                        link.update(parameters[0], parameters[1], others.values(preds[0])?, out)
                    }
                    FunctionOp::Full => function::full(parameters[0], others.values(preds[0])?, out),
                    FunctionOp::Sum => {
                        function::sum(others.values(preds[0])?, others.values(preds[1])?, out)
                    }
                    FunctionOp::Constant => out.fill(parameters[0]),
                    FunctionOp::Vectorized(v) => v.map(others.values(preds[0])?, out),
                    FunctionOp::UniformNoise(rng) => rng.fill_uniform(out, parameters[0], parameters[1]),
                }
            }
            LayerKind::Buffered(b) => {
                if let Some(pred) = b.predecessor {
                    let input = others.values(pred)?;
                    match b.op {
                        BufferedOp::LeakyIntegrator => {
                            buffered::leaky_integrate(parameters[0], values.as_slice(), input, &mut b.next_values)
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Expose the shadow buffer of a buffered layer.
    pub(crate) fn swap(&mut self) {
        if let LayerKind::Buffered(b) = &mut self.kind {
            self.values.swap_data(&mut b.next_values);
        }
    }

    /// Zero both buffers of a buffered layer.
    pub(crate) fn reset_state(&mut self) {
        if let LayerKind::Buffered(b) = &mut self.kind {
            self.values.fill(0.0);
            b.next_values.iter_mut().for_each(|v| *v = 0.0);
        }
    }

    /// Fail with `TypeMismatch` unless this is an input layer fed with `T`.
    pub(crate) fn check_input_type<T: 'static>(&self) -> FieldResult<()> {
        let registered = match &self.kind {
            LayerKind::Input(input) if input.accepts::<T>() => return Ok(()),
            LayerKind::Input(input) => input.input_type(),
            LayerKind::Function(_) => "nothing (function layer)",
            LayerKind::Buffered(_) => "nothing (buffered layer)",
        };
        Err(FieldError::TypeMismatch {
            label: self.display_name(),
            registered,
            requested: type_name::<T>(),
        })
    }

    /// Run the fill function of an input layer.
    pub(crate) fn fill_input<T: 'static>(&mut self, input: &T) -> FieldResult<()> {
        if let LayerKind::Input(layer) = &self.kind {
            if layer.fill(self.values.as_mut_slice(), input) {
                return Ok(());
            }
        }
        self.check_input_type::<T>()
    }
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("label", &self.label)
            .field("name", &self.name())
            .field("shape", self.shape())
            .field("parameters", &self.parameters)
            .field("predecessors", &self.predecessors())
            .finish()
    }
}

/// Read access to every layer of a network except the one being updated.
pub(crate) struct Others<'a> {
    before: &'a [Layer],
    after: &'a [Layer],
}

impl<'a> Others<'a> {
    /// Split `layers` around `index`, returning the layer at `index` and a
    /// view over all the others.
    pub(crate) fn split(layers: &'a mut [Layer], index: usize) -> Option<(&'a mut Layer, Others<'a>)> {
        if index >= layers.len() {
            return None;
        }
        let (before, rest) = layers.split_at_mut(index);
        let (layer, after) = rest.split_first_mut()?;
        Some((layer, Others { before, after }))
    }

    fn get(&self, id: LayerId) -> FieldResult<&'a Layer> {
        let pivot = self.before.len();
        let layer = if id.0 < pivot {
            self.before.get(id.0)
        } else if id.0 > pivot {
            self.after.get(id.0 - pivot - 1)
        } else {
            None
        };
        layer.ok_or(FieldError::UnknownLayer(id.0))
    }

    fn values(&self, id: LayerId) -> FieldResult<&'a [f64]> {
        Ok(self.get(id)?.values())
    }
}

fn validate_alpha(label: &str, alpha: f64) -> FieldResult<()> {
    if alpha > 0.0 && alpha <= 1.0 {
        Ok(())
    } else {
        Err(FieldError::invalid_parameter(
            label,
            format!("leaky integrator alpha must lie in (0, 1], got {alpha}"),
        ))
    }
}

fn validate_noise_range(label: &str, min: f64, max: f64) -> FieldResult<()> {
    if min <= max {
        Ok(())
    } else {
        Err(FieldError::invalid_parameter(
            label,
            format!("uniform noise range is empty: min {min} > max {max}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape10() -> Shape {
        Shape::d1(10).unwrap()
    }

    #[test]
    fn test_parameter_counts() {
        assert_eq!(Layer::sum("s", shape10()).parameter_count(), 0);
        assert_eq!(Layer::full("f", shape10(), 1.0).parameter_count(), 1);
        assert_eq!(
            Layer::gaussian("g", shape10(), 1.0, 1.0, false, false)
                .unwrap()
                .parameter_count(),
            2
        );
        assert_eq!(Layer::leaky_integrator("u", shape10(), 0.1).unwrap().parameter_count(), 1);
    }

    #[test]
    fn test_set_parameters_arity() {
        let mut layer = Layer::full("f", shape10(), 1.0);
        let err = layer.set_parameters(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            FieldError::ParameterArityMismatch { expected: 1, found: 2, .. }
        ));
        assert_eq!(layer.parameters(), &[1.0]);
    }

    #[test]
    fn test_constant_refills_on_set_parameters() {
        let mut layer = Layer::constant("h", shape10(), 0.5);
        assert!(layer.values().iter().all(|&v| v == 0.5));
        layer.set_parameters(&[-1.0]).unwrap();
        assert!(layer.values().iter().all(|&v| v == -1.0));
    }

    #[test]
    fn test_invalid_alpha_is_rejected_atomically() {
        let mut layer = Layer::leaky_integrator("u", shape10(), 0.1).unwrap();
        assert!(layer.set_parameters(&[1.5]).is_err());
        assert_eq!(layer.parameters(), &[0.1]);
        assert!(Layer::leaky_integrator("u", shape10(), 0.0).is_err());
    }

    #[test]
    fn test_unknown_function_name() {
        let err = Layer::function("f", shape10(), "softplus").unwrap_err();
        assert!(matches!(err, FieldError::UnknownFunction(_)));
    }

    #[test]
    fn test_noise_range() {
        assert!(Layer::uniform_noise("n", shape10(), 1.0, 0.0, 3).is_err());
        let mut layer = Layer::uniform_noise("n", shape10(), 0.0, 1.0, 3).unwrap();
        assert!(layer.set_parameters(&[2.0, 1.0]).is_err());
        assert_eq!(layer.parameters(), &[0.0, 1.0]);
    }

    #[test]
    fn test_display_name_of_unlabeled_layer() {
        assert_eq!(Layer::sum("", shape10()).display_name(), "<unlabeled sum>");
        assert_eq!(Layer::sum("s", shape10()).display_name(), "s");
    }
}
