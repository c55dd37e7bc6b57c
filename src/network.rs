//! Network of layers: registration, wiring, scheduling and ticks
//!
//! The network owns every layer in insertion order and hands out `LayerId`
//! handles to wire them. `init` orders the function layers so that each
//! one runs after its function-layer predecessors; input and buffered
//! layers are sources available at the start of every tick.
//!
//! A tick runs in three phases:
//! 1. every buffered layer computes its next state from the current values
//! 2. every buffered layer swaps that state in
//! 3. function layers are recomputed in evaluation order

use std::collections::HashMap;
use std::fmt::Write as _;

use tracing::{debug, info, trace};

use crate::error::{FieldError, FieldResult};
use crate::layers::{InputId, Layer, LayerId, Others, Shape};

/// Owner of a computation graph of layers.
///
/// # Example
///
/// ```ignore
/// use rust_neural_fields::{Network, Shape};
///
/// let shape = Shape::d1(10)?;
/// let mut net = Network::new();
/// let input = net.input("input", shape.clone(), |v: &mut [f64], x: &f64| v.fill(*x))?;
/// let u = net.leaky_integrator("u", shape.clone(), 0.1)?;
/// net.connect(u, input)?;
/// net.init()?;
/// net.set_input("input", &1.0)?;
/// net.step()?;
/// ```
#[derive(Debug, Default)]
pub struct Network {
    layers: Vec<Layer>,
    labels: HashMap<String, LayerId>,
    input_layers: Vec<LayerId>,
    function_layers: Vec<LayerId>,
    buffered_layers: Vec<LayerId>,
    initialized: bool,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a layer and return its handle.
    ///
    /// Non-empty labels must be unique; a duplicate fails with
    /// `DuplicateLabel` and leaves the network unchanged.
    pub fn add(&mut self, layer: Layer) -> FieldResult<LayerId> {
        let id = LayerId(self.layers.len());
        if !layer.label().is_empty() {
            if self.labels.contains_key(layer.label()) {
                return Err(FieldError::DuplicateLabel(layer.label().to_string()));
            }
            self.labels.insert(layer.label().to_string(), id);
        }

        if layer.is_input() {
            self.input_layers.push(id);
        } else if layer.is_function() {
            self.function_layers.push(id);
        } else {
            self.buffered_layers.push(id);
        }
        self.layers.push(layer);
        self.initialized = false;
        Ok(id)
    }

    pub fn input<T, F>(&mut self, label: &str, shape: Shape, filler: F) -> FieldResult<LayerId>
    where
        T: 'static,
        F: Fn(&mut [f64], &T) + 'static,
    {
        self.add(Layer::input(label, shape, filler))
    }

    pub fn gaussian(
        &mut self,
        label: &str,
        shape: Shape,
        amplitude: f64,
        spread: f64,
        toric: bool,
        scale: bool,
    ) -> FieldResult<LayerId> {
        self.add(Layer::gaussian(label, shape, amplitude, spread, toric, scale)?)
    }

    pub fn heaviside(
        &mut self,
        label: &str,
        shape: Shape,
        weight: f64,
        radius: f64,
        toric: bool,
    ) -> FieldResult<LayerId> {
        self.add(Layer::heaviside(label, shape, weight, radius, toric)?)
    }

    pub fn full(&mut self, label: &str, shape: Shape, weight: f64) -> FieldResult<LayerId> {
        self.add(Layer::full(label, shape, weight))
    }

    pub fn constant(&mut self, label: &str, shape: Shape, value: f64) -> FieldResult<LayerId> {
        self.add(Layer::constant(label, shape, value))
    }

    pub fn function(&mut self, label: &str, shape: Shape, name: &str) -> FieldResult<LayerId> {
        self.add(Layer::function(label, shape, name)?)
    }

    pub fn uniform_noise(
        &mut self,
        label: &str,
        shape: Shape,
        min: f64,
        max: f64,
        seed: u64,
    ) -> FieldResult<LayerId> {
        self.add(Layer::uniform_noise(label, shape, min, max, seed)?)
    }

    pub fn leaky_integrator(&mut self, label: &str, shape: Shape, alpha: f64) -> FieldResult<LayerId> {
        self.add(Layer::leaky_integrator(label, shape, alpha)?)
    }

    /// Sum layer of `a` and `b`, with `a`'s shape.
    ///
    /// With an empty `label` and two labeled operands, the layer is labeled
    /// `"a+b"`, so chained sums read like the expression they compute.
    pub fn sum(&mut self, a: LayerId, b: LayerId, label: &str) -> FieldResult<LayerId> {
        let (shape, label) = {
            let la = self.layer(a)?;
            let lb = self.layer(b)?;
            let label = if label.is_empty() && !la.label().is_empty() && !lb.label().is_empty() {
                format!("{}+{}", la.label(), lb.label())
            } else {
                label.to_string()
            };
            (la.shape().clone(), label)
        };
        let id = self.add(Layer::sum(label, shape))?;
        self.connect(id, a)?;
        self.connect(id, b)?;
        Ok(id)
    }

    /// Make `source` a predecessor of `destination`.
    ///
    /// Function layers append to their ordered predecessors, buffered layers
    /// replace their single one. The source must have the destination's
    /// shape unless the destination is a full layer.
    pub fn connect(&mut self, destination: LayerId, source: LayerId) -> FieldResult<()> {
        let source_shape = self.layer(source)?.shape().clone();
        if destination == source {
            return Err(FieldError::InvalidConnection {
                label: self.layer(destination)?.display_name(),
                reason: "a layer cannot be its own predecessor".to_string(),
            });
        }
        self.layer_mut(destination)?.connect_from(source, &source_shape)?;
        self.initialized = false;
        Ok(())
    }

    /// Remove `source` from the predecessors of `destination`. Returns
    /// whether the link existed.
    pub fn disconnect(&mut self, destination: LayerId, source: LayerId) -> FieldResult<bool> {
        self.layer(source)?;
        let removed = self.layer_mut(destination)?.disconnect_from(source);
        if removed {
            self.initialized = false;
        }
        Ok(removed)
    }

    /// Order the function layers and prime the graph.
    ///
    /// Layers that are ready at the same time keep their insertion order.
    /// On failure the previous order is kept and the network stays
    /// uninitialized.
    pub fn init(&mut self) -> FieldResult<()> {
        for layer in &self.layers {
            layer.check_connections()?;
        }

        let mut evaluated = vec![false; self.layers.len()];
        for id in self.input_layers.iter().chain(&self.buffered_layers) {
            evaluated[id.0] = true;
        }

        let layers = &self.layers;
        let mut order = Vec::with_capacity(self.function_layers.len());
        let mut remaining = self.function_layers.clone();
        // Ties follow registration order.
        remaining.sort_unstable();
        while !remaining.is_empty() {
            let pending = remaining.len();
            remaining.retain(|&id| {
                let ready = layers[id.0].predecessors().iter().all(|p| evaluated[p.0]);
                if ready {
                    evaluated[id.0] = true;
                    order.push(id);
                }
                !ready
            });
            if remaining.len() == pending {
                let labels = remaining
                    .iter()
                    .map(|&id| self.label_or_id(id))
                    .collect();
                return Err(FieldError::CyclicDependency { labels });
            }
        }

        self.function_layers = order;
        debug!(
            order = ?self.function_layers.iter().map(|&id| self.label_or_id(id)).collect::<Vec<_>>(),
            "function layer evaluation order"
        );

        self.propagate()?;
        self.initialized = true;
        info!(
            inputs = self.input_layers.len(),
            functions = self.function_layers.len(),
            buffered = self.buffered_layers.len(),
            "network initialized"
        );
        Ok(())
    }

    /// Advance the network by one tick.
    pub fn step(&mut self) -> FieldResult<()> {
        self.ensure_initialized()?;
        for k in 0..self.buffered_layers.len() {
            let id = self.buffered_layers[k];
            self.update_layer(id)?;
        }
        for k in 0..self.buffered_layers.len() {
            let id = self.buffered_layers[k];
            self.layers[id.0].swap();
        }
        self.propagate()?;
        trace!("network step");
        Ok(())
    }

    /// Zero every buffered layer and propagate through the function layers.
    pub fn reset(&mut self) -> FieldResult<()> {
        self.ensure_initialized()?;
        for k in 0..self.buffered_layers.len() {
            let id = self.buffered_layers[k];
            self.layers[id.0].reset_state();
        }
        self.propagate()
    }

    /// Checked handle to the input layer `label` fed with `T`.
    pub fn get_input<T: 'static>(&self, label: &str) -> FieldResult<InputId<T>> {
        let id = self.id_of(label)?;
        self.layers[id.0].check_input_type::<T>()?;
        Ok(InputId::new(id))
    }

    /// Fill the input layer `label` and propagate the new input through the
    /// function layers of an initialized network.
    pub fn set_input<T: 'static>(&mut self, label: &str, input: &T) -> FieldResult<()> {
        let id = self.id_of(label)?;
        self.fill_and_propagate(id, input)
    }

    /// `set_input` through a checked handle.
    pub fn fill_input<T: 'static>(&mut self, input_id: InputId<T>, input: &T) -> FieldResult<()> {
        self.layer(input_id.id())?;
        self.fill_and_propagate(input_id.id(), input)
    }

    fn fill_and_propagate<T: 'static>(&mut self, id: LayerId, input: &T) -> FieldResult<()> {
        self.layers[id.0].fill_input(input)?;
        if self.initialized {
            self.propagate()?;
        }
        Ok(())
    }

    pub fn get(&self, label: &str) -> FieldResult<&Layer> {
        let id = self.id_of(label)?;
        Ok(&self.layers[id.0])
    }

    /// Replace the parameters of the layer `label`. Changes reach the
    /// function layers on the next tick.
    pub fn set_parameters(&mut self, label: &str, parameters: &[f64]) -> FieldResult<()> {
        let id = self.id_of(label)?;
        self.set_layer_parameters(id, parameters)
    }

    /// `set_parameters` by handle.
    pub fn set_layer_parameters(&mut self, id: LayerId, parameters: &[f64]) -> FieldResult<()> {
        self.layer_mut(id)?.set_parameters(parameters)
    }

    pub fn id_of(&self, label: &str) -> FieldResult<LayerId> {
        self.labels
            .get(label)
            .copied()
            .ok_or_else(|| FieldError::UnknownLabel(label.to_string()))
    }

    pub fn layer(&self, id: LayerId) -> FieldResult<&Layer> {
        self.layers.get(id.0).ok_or(FieldError::UnknownLayer(id.0))
    }

    pub(crate) fn layer_mut(&mut self, id: LayerId) -> FieldResult<&mut Layer> {
        self.layers.get_mut(id.0).ok_or(FieldError::UnknownLayer(id.0))
    }

    /// Current values of the layer `label`.
    pub fn values(&self, label: &str) -> FieldResult<&[f64]> {
        Ok(self.get(label)?.values())
    }

    /// Function layers, in evaluation order once initialized.
    pub fn function_order(&self) -> &[LayerId] {
        &self.function_layers
    }

    pub fn input_layers(&self) -> &[LayerId] {
        &self.input_layers
    }

    pub fn buffered_layers(&self) -> &[LayerId] {
        &self.buffered_layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Multi-line summary of the layers by kind, function layers in their
    /// current order.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "******** Network");
        for (title, ids) in [
            ("input", &self.input_layers),
            ("function", &self.function_layers),
            ("buffered", &self.buffered_layers),
        ] {
            let _ = writeln!(out, "  {} {} layers", ids.len(), title);
            for &id in ids.iter() {
                let layer = &self.layers[id.0];
                let preds: Vec<String> = layer
                    .predecessors()
                    .iter()
                    .map(|&p| self.label_or_id(p))
                    .collect();
                let _ = write!(
                    out,
                    "     '{}' {} {}",
                    self.label_or_id(id),
                    layer.name(),
                    layer.shape()
                );
                if !preds.is_empty() {
                    let _ = write!(out, " <- {}", preds.join(", "));
                }
                let _ = writeln!(out);
            }
        }
        let _ = write!(out, "****************");
        out
    }

    fn label_or_id(&self, id: LayerId) -> String {
        match self.layers.get(id.0) {
            Some(layer) if !layer.label().is_empty() => layer.label().to_string(),
            _ => id.to_string(),
        }
    }

    fn ensure_initialized(&self) -> FieldResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(FieldError::NotInitialized)
        }
    }

    fn update_layer(&mut self, id: LayerId) -> FieldResult<()> {
        let (layer, others) =
            Others::split(&mut self.layers, id.0).ok_or(FieldError::UnknownLayer(id.0))?;
        layer.update(&others)
    }

    fn propagate(&mut self) -> FieldResult<()> {
        for k in 0..self.function_layers.len() {
            let id = self.function_layers[k];
            self.update_layer(id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(n: usize) -> Shape {
        Shape::d1(n).unwrap()
    }

    #[test]
    fn test_duplicate_label() {
        let mut net = Network::new();
        net.constant("u", shape(3), 1.0).unwrap();
        let err = net.constant("u", shape(3), 2.0).unwrap_err();
        assert!(matches!(err, FieldError::DuplicateLabel(ref l) if l == "u"));
        assert_eq!(net.values("u").unwrap(), &[1.0, 1.0, 1.0]);
        assert_eq!(net.len(), 1);
    }

    #[test]
    fn test_unlabeled_layers_do_not_collide() {
        let mut net = Network::new();
        net.constant("", shape(3), 1.0).unwrap();
        net.constant("", shape(3), 2.0).unwrap();
        assert_eq!(net.len(), 2);
    }

    #[test]
    fn test_step_before_init() {
        let mut net = Network::new();
        net.constant("h", shape(3), 1.0).unwrap();
        assert!(matches!(net.step(), Err(FieldError::NotInitialized)));
        assert!(matches!(net.reset(), Err(FieldError::NotInitialized)));
    }

    #[test]
    fn test_self_connection_rejected() {
        let mut net = Network::new();
        let f = net.function("f", shape(3), "relu").unwrap();
        assert!(matches!(
            net.connect(f, f),
            Err(FieldError::InvalidConnection { .. })
        ));
    }

    #[test]
    fn test_sum_auto_label() {
        let mut net = Network::new();
        let a = net.constant("a", shape(2), 1.0).unwrap();
        let b = net.constant("b", shape(2), 2.0).unwrap();
        let s = net.sum(a, b, "").unwrap();
        assert_eq!(net.layer(s).unwrap().label(), "a+b");
        net.init().unwrap();
        assert_eq!(net.values("a+b").unwrap(), &[3.0, 3.0]);
    }

    #[test]
    fn test_describe_lists_layers() {
        let mut net = Network::new();
        let a = net.constant("a", shape(2), 1.0).unwrap();
        let u = net.leaky_integrator("u", shape(2), 0.5).unwrap();
        net.connect(u, a).unwrap();
        net.init().unwrap();
        let text = net.describe();
        assert!(text.contains("1 function layers"));
        assert!(text.contains("'u' leaky_integrator [2] <- a"));
    }
}
