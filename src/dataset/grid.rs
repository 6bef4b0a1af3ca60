//! Coordinate-labelled dataset
//!
//! Dimensions, coordinates and data variables are kept in insertion order;
//! that order drives the column order of the flattened table.

use super::types::{ArrayData, Variable};
use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::ops::Range;

/// A labelled collection of N-dimensional arrays sharing named dimensions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridDataset {
    dims: IndexMap<String, usize>,
    coords: IndexMap<String, Variable>,
    data_vars: IndexMap<String, Variable>,
}

impl GridDataset {
    /// Create an empty dataset
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------------
    // Builders
    // ------------------------------------------------------------------------

    /// Declare a dimension without a coordinate
    pub fn with_dim(mut self, name: impl Into<String>, len: usize) -> Result<Self> {
        self.register_dim(&name.into(), len)?;
        Ok(self)
    }

    /// Add a 1-D dimension coordinate; the dimension takes the coordinate's name
    pub fn with_coord(mut self, name: impl Into<String>, values: impl Into<ArrayData>) -> Result<Self> {
        let name = name.into();
        let var = Variable::new([name.clone()], values)?;
        self.insert_coord(name, var)?;
        Ok(self)
    }

    /// Add a data variable spanning `dims`
    pub fn with_var<S: Into<String>>(
        mut self,
        name: impl Into<String>,
        dims: impl IntoIterator<Item = S>,
        data: impl Into<ArrayData>,
    ) -> Result<Self> {
        self.insert_var(name, Variable::new(dims, data)?)?;
        Ok(self)
    }

    /// Insert or replace a coordinate variable
    pub fn insert_coord(&mut self, name: impl Into<String>, var: Variable) -> Result<()> {
        let name = name.into();
        self.check_dims(&name, &var)?;
        self.data_vars.shift_remove(&name);
        self.coords.insert(name, var);
        Ok(())
    }

    /// Insert or replace a data variable
    pub fn insert_var(&mut self, name: impl Into<String>, var: Variable) -> Result<()> {
        let name = name.into();
        self.check_dims(&name, &var)?;
        self.coords.shift_remove(&name);
        self.data_vars.insert(name, var);
        Ok(())
    }

    /// Validate `var` against known dimension lengths, registering new ones
    fn check_dims(&mut self, name: &str, var: &Variable) -> Result<()> {
        // a variable named after one of its dims must be that dim's 1-D coordinate
        if var.axis_of(name).is_some() && var.dims().len() != 1 {
            return Err(Error::shape(
                name,
                format!(
                    "variable shares its name with one of its dimensions {:?}; only a 1-d coordinate may",
                    var.dims()
                ),
            ));
        }

        for (dim, len) in var.dims().iter().zip(var.shape()) {
            if let Some(known) = self.dims.get(dim) {
                if known != len {
                    return Err(Error::shape(
                        name,
                        format!("dimension '{dim}' has length {len}, dataset has {known}"),
                    ));
                }
            }
        }

        for (dim, len) in var.dims().iter().zip(var.shape()) {
            self.register_dim(dim, *len)?;
        }
        Ok(())
    }

    fn register_dim(&mut self, name: &str, len: usize) -> Result<()> {
        match self.dims.get(name) {
            Some(known) if *known != len => Err(Error::shape(
                name,
                format!("dimension redeclared with length {len}, dataset has {known}"),
            )),
            Some(_) => Ok(()),
            None => {
                self.dims.insert(name.to_string(), len);
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Dimensions and their lengths, in declaration order
    pub fn dims(&self) -> &IndexMap<String, usize> {
        &self.dims
    }

    /// Length of dimension `name`
    pub fn dim_len(&self, name: &str) -> Result<usize> {
        self.dims
            .get(name)
            .copied()
            .ok_or_else(|| Error::missing_dim(name))
    }

    /// Coordinate by name
    pub fn coord(&self, name: &str) -> Option<&Variable> {
        self.coords.get(name)
    }

    /// Data variable by name
    pub fn var(&self, name: &str) -> Option<&Variable> {
        self.data_vars.get(name)
    }

    /// Coordinate or data variable by name
    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.coord(name).or_else(|| self.var(name))
    }

    /// Whether a coordinate or data variable called `name` exists
    pub fn contains(&self, name: &str) -> bool {
        self.coords.contains_key(name) || self.data_vars.contains_key(name)
    }

    /// Coordinates in insertion order
    pub fn coords(&self) -> impl Iterator<Item = (&String, &Variable)> {
        self.coords.iter()
    }

    /// Data variables in insertion order
    pub fn data_vars(&self) -> impl Iterator<Item = (&String, &Variable)> {
        self.data_vars.iter()
    }

    /// Numeric values of the 1-D coordinate `name`
    pub fn coord_values(&self, name: &str) -> Result<Vec<f64>> {
        let coord = self.get(name).ok_or_else(|| Error::missing_var(name))?;
        if coord.dims().len() != 1 {
            return Err(Error::shape(
                name,
                format!("expected a 1-d coordinate, found {} dims", coord.dims().len()),
            ));
        }
        coord.data().to_f64_vec().ok_or_else(|| {
            Error::shape(
                name,
                format!("coordinate is {}, expected numeric", coord.data().type_name()),
            )
        })
    }

    /// Number of rows the dataset flattens to: the product of all dimension lengths
    pub fn num_rows(&self) -> usize {
        self.dims.values().product()
    }

    // ------------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------------

    /// Owned copy of the dataset restricted to `range` along `dim`
    ///
    /// Variables that do not span `dim` are carried over whole.
    pub fn slice(&self, dim: &str, range: Range<usize>) -> Result<Self> {
        let len = self.dim_len(dim)?;
        if range.start > range.end || range.end > len {
            return Err(Error::shape(
                dim,
                format!("slice {}..{} out of bounds for length {len}", range.start, range.end),
            ));
        }

        let mut dims = self.dims.clone();
        dims.insert(dim.to_string(), range.end - range.start);

        let select = |vars: &IndexMap<String, Variable>| {
            vars.iter()
                .map(|(name, var)| (name.clone(), var.slice(dim, range.clone())))
                .collect::<IndexMap<_, _>>()
        };

        Ok(Self {
            dims,
            coords: select(&self.coords),
            data_vars: select(&self.data_vars),
        })
    }
}
