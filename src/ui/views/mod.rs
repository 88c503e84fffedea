mod config_tree;
mod machine_list;
mod part_detail;

pub use config_tree::ConfigTreeView;
pub use machine_list::MachineListView;
pub use part_detail::PartDetailView;
