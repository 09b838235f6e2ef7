mod atom_scenarios;
mod tree_scenarios;
