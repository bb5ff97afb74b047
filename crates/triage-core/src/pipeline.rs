//! Graph wiring.
//!
//! Two shapes are ever built: the full five-node triage graph and a
//! single-node classify graph for bulk runs. Both entry branches hang off
//! the virtual start marker; generate waits on classify purely for
//! ordering.

use std::sync::Arc;

use triage_capability::Capabilities;
use triage_graph::{GraphBuilder, GraphDefinitionError, TaskGraph, START};

use crate::nodes::{
    node_name, ClassifyNode, EvaluateConfidenceNode, GenerateNode, ResolveAndFormatNode,
    RetrieveNode,
};

/// classify and retrieve in parallel, then generate, evaluate_confidence,
/// resolve_and_format in sequence.
pub fn triage_graph(caps: &Capabilities) -> Result<TaskGraph, GraphDefinitionError> {
    let mut builder = GraphBuilder::new();
    builder.add_node(ClassifyNode::new(Arc::clone(&caps.classifier)))?;
    builder.add_node(RetrieveNode::new(Arc::clone(&caps.retriever)))?;
    builder.add_node(GenerateNode::new(Arc::clone(&caps.generator)))?;
    builder.add_node(EvaluateConfidenceNode::new(Arc::clone(&caps.scorer)))?;
    builder.add_node(ResolveAndFormatNode)?;

    builder.add_edge(START, node_name::CLASSIFY)?;
    builder.add_edge(START, node_name::RETRIEVE)?;
    builder.add_edge(node_name::CLASSIFY, node_name::GENERATE)?;
    builder.add_edge(node_name::RETRIEVE, node_name::GENERATE)?;
    builder.add_edge(node_name::GENERATE, node_name::EVALUATE_CONFIDENCE)?;
    builder.add_edge(node_name::EVALUATE_CONFIDENCE, node_name::RESOLVE_AND_FORMAT)?;
    builder.build()
}

/// Just the classify node, for cheap bulk classification.
pub fn classify_graph(caps: &Capabilities) -> Result<TaskGraph, GraphDefinitionError> {
    let mut builder = GraphBuilder::new();
    builder.add_node(ClassifyNode::new(Arc::clone(&caps.classifier)))?;
    builder.add_edge(START, node_name::CLASSIFY)?;
    builder.build()
}
