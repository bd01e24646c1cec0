mod overlay;
mod project;
mod proximity;
