// Infrastructure layer - driven adapters implementing the application ports

pub mod driven;
