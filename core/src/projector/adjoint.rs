use std::fmt;
use std::sync::Arc;

use log::debug;
use ndarray::{Array3, ArrayView3};

use crate::prelude::ReconResult;
use crate::projector::{NativeProjector, OperatorAttributes};

/// Identity of a differentiable projector node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    Project,
    Backproject,
}

impl OperatorKind {
    /// The operator whose forward pass is this operator's gradient.
    pub fn adjoint(self) -> Self {
        match self {
            OperatorKind::Project => OperatorKind::Backproject,
            OperatorKind::Backproject => OperatorKind::Project,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OperatorKind::Project => "Project",
            OperatorKind::Backproject => "Backproject",
        }
    }

    /// Runs this operator's forward pass.
    pub fn apply<P: NativeProjector + ?Sized>(
        self,
        projector: &P,
        input: ArrayView3<f32>,
        attributes: &OperatorAttributes,
    ) -> ReconResult<Array3<f32>> {
        match self {
            OperatorKind::Project => projector.forward_project(input, attributes),
            OperatorKind::Backproject => projector.backproject(input, attributes),
        }
    }

    /// Gradient with respect to the single differentiable input.
    pub fn gradient<P: NativeProjector + ?Sized>(
        self,
        projector: &P,
        output_gradient: ArrayView3<f32>,
        attributes: &OperatorAttributes,
    ) -> ReconResult<Array3<f32>> {
        debug!("{} gradient via {}", self.name(), self.adjoint().name());
        self.adjoint().apply(projector, output_gradient, attributes)
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An operator that can be placed in a differentiation graph.
///
/// `backward` receives the gradient flowing into the operator's output and the
/// attribute bundle captured when the operator ran, and returns the gradient
/// with respect to its one differentiable input.
pub trait DifferentiableOperator {
    fn kind(&self) -> OperatorKind;
    fn attributes(&self) -> &OperatorAttributes;
    fn forward(&self, input: ArrayView3<f32>) -> ReconResult<Array3<f32>>;
    fn backward(
        &self,
        output_gradient: ArrayView3<f32>,
        attributes: &OperatorAttributes,
    ) -> ReconResult<Array3<f32>>;
}

/// Forward projection `A`: volume to projections.
pub struct ProjectOp<P: NativeProjector> {
    projector: Arc<P>,
    attributes: OperatorAttributes,
}

/// Backprojection `Aᵗ`: projections to volume.
pub struct BackprojectOp<P: NativeProjector> {
    projector: Arc<P>,
    attributes: OperatorAttributes,
}

impl<P: NativeProjector> ProjectOp<P> {
    pub fn new(projector: Arc<P>, attributes: OperatorAttributes) -> Self {
        Self {
            projector,
            attributes,
        }
    }

    pub fn adjoint(&self) -> BackprojectOp<P> {
        BackprojectOp::new(self.projector.clone(), self.attributes.clone())
    }
}

impl<P: NativeProjector> BackprojectOp<P> {
    pub fn new(projector: Arc<P>, attributes: OperatorAttributes) -> Self {
        Self {
            projector,
            attributes,
        }
    }

    pub fn adjoint(&self) -> ProjectOp<P> {
        ProjectOp::new(self.projector.clone(), self.attributes.clone())
    }
}

impl<P: NativeProjector> Clone for ProjectOp<P> {
    fn clone(&self) -> Self {
        Self::new(self.projector.clone(), self.attributes.clone())
    }
}

impl<P: NativeProjector> Clone for BackprojectOp<P> {
    fn clone(&self) -> Self {
        Self::new(self.projector.clone(), self.attributes.clone())
    }
}

impl<P: NativeProjector> DifferentiableOperator for ProjectOp<P> {
    fn kind(&self) -> OperatorKind {
        OperatorKind::Project
    }

    fn attributes(&self) -> &OperatorAttributes {
        &self.attributes
    }

    fn forward(&self, input: ArrayView3<f32>) -> ReconResult<Array3<f32>> {
        self.kind().apply(self.projector.as_ref(), input, &self.attributes)
    }

    fn backward(
        &self,
        output_gradient: ArrayView3<f32>,
        attributes: &OperatorAttributes,
    ) -> ReconResult<Array3<f32>> {
        self.kind()
            .gradient(self.projector.as_ref(), output_gradient, attributes)
    }
}

impl<P: NativeProjector> DifferentiableOperator for BackprojectOp<P> {
    fn kind(&self) -> OperatorKind {
        OperatorKind::Backproject
    }

    fn attributes(&self) -> &OperatorAttributes {
        &self.attributes
    }

    fn forward(&self, input: ArrayView3<f32>) -> ReconResult<Array3<f32>> {
        self.kind().apply(self.projector.as_ref(), input, &self.attributes)
    }

    fn backward(
        &self,
        output_gradient: ArrayView3<f32>,
        attributes: &OperatorAttributes,
    ) -> ReconResult<Array3<f32>> {
        self.kind()
            .gradient(self.projector.as_ref(), output_gradient, attributes)
    }
}

/// One recorded operator call: the operator itself and the bundle it ran with.
pub struct Invocation {
    operator: Box<dyn DifferentiableOperator>,
    attributes: OperatorAttributes,
}

impl Invocation {
    pub fn kind(&self) -> OperatorKind {
        self.operator.kind()
    }

    pub fn attributes(&self) -> &OperatorAttributes {
        &self.attributes
    }

    fn backward(&self, output_gradient: ArrayView3<f32>) -> ReconResult<Array3<f32>> {
        self.operator.backward(output_gradient, &self.attributes)
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("kind", &self.kind())
            .field("attributes", &self.attributes)
            .finish()
    }
}

/// Records a chain of projector calls and replays their gradients in reverse.
///
/// Every invocation keeps the operator that ran and its own copy of the
/// attribute bundle, so the backward pass goes through the same projector and
/// configuration the forward pass used.
#[derive(Debug, Default)]
pub struct GradientTape {
    invocations: Vec<Invocation>,
}

impl GradientTape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `op` forward and records the call.
    pub fn record<O>(&mut self, op: &O, input: ArrayView3<f32>) -> ReconResult<Array3<f32>>
    where
        O: DifferentiableOperator + Clone + 'static,
    {
        let output = op.forward(input)?;
        self.invocations.push(Invocation {
            attributes: op.attributes().clone(),
            operator: Box::new(op.clone()),
        });
        Ok(output)
    }

    pub fn invocations(&self) -> &[Invocation] {
        &self.invocations
    }

    /// Gradient of the taped chain with respect to its first input.
    pub fn backward(&self, output_gradient: Array3<f32>) -> ReconResult<Array3<f32>> {
        self.invocations
            .iter()
            .rev()
            .try_fold(output_gradient, |grad, invocation| invocation.backward(grad.view()))
    }

    pub fn clear(&mut self) {
        self.invocations.clear();
    }
}
