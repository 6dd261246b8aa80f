pub mod eval_plan;
