//! Validation of a project's control-flow graph and of the references
//! its actions, parameters and action points carry.

mod checks;
mod errors;
mod logic;

pub use checks::{
    check_action_params, check_ap_parent, check_flows, check_project_parameter, project_problems,
    scene_problems,
};
pub use errors::Error;
pub use logic::{check_for_loops, check_logic_item, FlowGraph, LogicContainer};
